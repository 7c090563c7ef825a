//! core
//!
//! Core domain types and the simulated repository.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, TagName, FilePath, EntityId, etc.
//! - [`entity`] - Commit, branch and tag value objects
//! - [`graph`] - Commit DAG representation and traversal
//! - [`repo`] - The repository aggregate and its transitions
//! - [`verify`] - Verification of repository invariants
//! - [`context`] - Explicit per-session context
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Every transition is all-or-nothing
//! - All verification is deterministic

pub mod config;
pub mod context;
pub mod entity;
pub mod graph;
pub mod repo;
pub mod types;
pub mod verify;

use serde::{Deserialize, Serialize};

/// Category of a rejected command or an isolated failure.
///
/// Every error type in the crate maps onto one of these so that the
/// presentation layer can pick a presentation (hint, inline message,
/// conflict banner) without matching on concrete error enums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Command is not whitelisted for the current step.
    CommandNotAllowed,
    /// Malformed command syntax or unknown command.
    InvalidArguments,
    /// Reference to a branch, tag, commit or path that does not exist.
    InvalidTarget,
    /// A merge stopped with overlapping changes.
    ///
    /// The merge itself succeeds, so this never comes from an error's
    /// `kind()`. It classifies the conflict banner.
    MergeConflict,
    /// An event subscriber failed.
    EventHandlerFailure,
    /// The command needs an initialized repository.
    NotARepository,
    /// Commit requested with nothing staged.
    NothingToCommit,
    /// Branch, tag or repository already exists.
    AlreadyExists,
    /// Conflicts or an unfinished merge block the command.
    ConflictPending,
    /// Uncommitted changes would be overwritten.
    DirtyWorkingTree,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::CommandNotAllowed => "command_not_allowed",
            ErrorKind::InvalidArguments => "invalid_arguments",
            ErrorKind::InvalidTarget => "invalid_target",
            ErrorKind::MergeConflict => "merge_conflict",
            ErrorKind::EventHandlerFailure => "event_handler_failure",
            ErrorKind::NotARepository => "not_a_repository",
            ErrorKind::NothingToCommit => "nothing_to_commit",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::ConflictPending => "conflict_pending",
            ErrorKind::DirtyWorkingTree => "dirty_working_tree",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
