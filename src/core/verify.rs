//! core::verify
//!
//! Structural verification of a repository.
//!
//! Runs after every applied transition. A failure here means a transition
//! broke the model, never that the learner did something wrong.
//!
//! # Checks
//!
//! - Every parent of every commit exists
//! - The commit graph is acyclic
//! - HEAD, branches and tags point at existing commits
//! - Staged paths exist in the working tree or in HEAD
//! - Conflicted paths exist only while a merge is pending
//!
//! # Invariants
//!
//! - Never mutates the repository
//! - Must be deterministic

use thiserror::Error;

use super::repo::{Head, Repository};
use super::types::{EntityId, FilePath};

/// Errors from verification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("cycle detected in commit graph at {0}")]
    CycleDetected(EntityId),

    #[error("commit {child} names missing parent {parent}")]
    DanglingParent { child: EntityId, parent: EntityId },

    #[error("commit {0} is not in the commit graph")]
    UnindexedCommit(EntityId),

    #[error("HEAD points at missing commit {0}")]
    HeadMissing(EntityId),

    #[error("{name} points at missing commit {target}")]
    RefMissing { name: String, target: EntityId },

    #[error("staged path {0} exists neither on disk nor in HEAD")]
    StagedPathMissing(FilePath),

    #[error("conflicted path {0} without a merge in progress")]
    StrayConflict(FilePath),
}

/// Result of verification.
#[derive(Debug)]
pub struct VerifyResult {
    /// Whether verification passed
    pub ok: bool,
    /// Errors found during verification
    pub errors: Vec<VerifyError>,
}

impl VerifyResult {
    pub fn success() -> Self {
        Self {
            ok: true,
            errors: vec![],
        }
    }

    pub fn failure(errors: Vec<VerifyError>) -> Self {
        Self { ok: false, errors }
    }
}

/// Verify the structural invariants of `repo`.
pub fn verify(repo: &Repository) -> VerifyResult {
    let mut errors = Vec::new();
    let graph = repo.graph();

    for commit in repo.commits() {
        if !graph.contains(&commit.id) {
            errors.push(VerifyError::UnindexedCommit(commit.id.clone()));
        }
    }
    if let Some((child, parent)) = graph.find_dangling_parent() {
        errors.push(VerifyError::DanglingParent { child, parent });
    }
    if let Some(id) = graph.find_cycle() {
        errors.push(VerifyError::CycleDetected(id));
    }

    if let Head::Detached(id) = repo.head() {
        if repo.find_commit(id).is_none() {
            errors.push(VerifyError::HeadMissing(id.clone()));
        }
    }
    for branch in repo.branches() {
        if repo.find_commit(&branch.target).is_none() {
            errors.push(VerifyError::RefMissing {
                name: format!("branch {}", branch.name),
                target: branch.target.clone(),
            });
        }
    }
    for tag in repo.tags() {
        if repo.find_commit(tag.target()).is_none() {
            errors.push(VerifyError::RefMissing {
                name: format!("tag {}", tag.name),
                target: tag.target().clone(),
            });
        }
    }

    for path in repo.staged() {
        if repo.file_status(path).is_none() {
            errors.push(VerifyError::StagedPathMissing(path.clone()));
        }
    }
    if repo.merging().is_none() {
        for path in repo.conflicts() {
            errors.push(VerifyError::StrayConflict(path.clone()));
        }
    }

    if errors.is_empty() {
        VerifyResult::success()
    } else {
        VerifyResult::failure(errors)
    }
}
