//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag. Command
//! output goes to stdout; errors, warnings and rejections go to stderr.

use std::fmt::Display;

use crate::core::types::{BranchName, FilePath};
use crate::core::ErrorKind;
use crate::engine::scenario::Step;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print a success message (respects quiet mode).
pub fn success(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a rejected or stopped command for the learner.
///
/// Whitelist rejections read as a hint and a stopped merge as a warning.
/// Everything else is an error line.
pub fn format_rejection(kind: ErrorKind, message: &str) -> String {
    match kind {
        ErrorKind::CommandNotAllowed => format!("hint: {message}"),
        ErrorKind::MergeConflict => {
            format!("warning: {message}\nhint: edit the files, git add them, then git commit")
        }
        ErrorKind::ConflictPending => {
            format!("error: {message}\nhint: fix the conflicts, git add the files, then git commit")
        }
        _ => format!("error: {message}"),
    }
}

/// Print a rejected command (always shown).
pub fn rejection(kind: ErrorKind, message: &str) {
    eprintln!("{}", format_rejection(kind, message));
}

/// Banner shown when a merge stops on conflicts.
pub fn format_conflict(branch: &BranchName, paths: &[FilePath]) -> String {
    format!(
        "Merging '{branch}' stopped with conflicts in:\n{}",
        format_list(paths, "    ")
    )
}

/// Title block for a step.
pub fn format_step(step: &Step, position: usize, total: usize) -> String {
    let mut out = format!("Step {position}/{total}: {}", step.title);
    if !step.description.is_empty() {
        out.push('\n');
        out.push_str(&step.description);
    }
    if !step.allowed_commands.is_empty() {
        out.push_str("\nAllowed: ");
        out.push_str(&step.allowed_commands.join(", "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn list_formatting() {
        assert_eq!(format_list(&["a", "b"], "- "), "- a\n- b");
        assert_eq!(format_list::<&str>(&[], "- "), "");
    }

    #[test]
    fn rejection_styles() {
        assert_eq!(
            format_rejection(ErrorKind::CommandNotAllowed, "nope"),
            "hint: nope"
        );
        assert_eq!(
            format_rejection(ErrorKind::InvalidTarget, "no such branch"),
            "error: no such branch"
        );
        assert!(format_rejection(ErrorKind::ConflictPending, "x").contains("git add"));

        let conflict = format_rejection(ErrorKind::MergeConflict, "Merging 'feature' stopped");
        assert!(conflict.starts_with("warning: Merging 'feature' stopped\nhint:"));
    }

    #[test]
    fn conflict_banner_lists_paths() {
        let banner = format_conflict(
            &BranchName::new("feature").unwrap(),
            &[FilePath::new("app.js").unwrap()],
        );
        assert_eq!(
            banner,
            "Merging 'feature' stopped with conflicts in:\n    app.js"
        );
    }
}
