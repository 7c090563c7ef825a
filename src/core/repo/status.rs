//! core::repo::status
//!
//! Working-tree status, derived by comparing files against the HEAD tree.

use serde::{Deserialize, Serialize};

use crate::core::types::{BranchName, FilePath};

/// Status of one path relative to the HEAD commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Present in the working tree, absent from HEAD.
    Untracked,
    /// Present in both, contents differ.
    Modified,
    /// Present in HEAD, absent from the working tree.
    Deleted,
    /// Present in both with equal contents.
    Unmodified,
    /// Left with conflict markers by a merge.
    Conflicted,
}

impl FileStatus {
    /// Derive the status from the HEAD and working-tree versions of a path.
    ///
    /// Returns `None` when the path exists in neither.
    pub fn derive(head: Option<&str>, working: Option<&str>) -> Option<Self> {
        match (head, working) {
            (None, None) => None,
            (None, Some(_)) => Some(FileStatus::Untracked),
            (Some(_), None) => Some(FileStatus::Deleted),
            (Some(h), Some(w)) if h == w => Some(FileStatus::Unmodified),
            (Some(_), Some(_)) => Some(FileStatus::Modified),
        }
    }

    /// Whether the path differs from HEAD.
    pub fn is_change(self) -> bool {
        self != FileStatus::Unmodified
    }

    /// Whether HEAD knows this path (so `commit -a` picks it up).
    pub fn is_tracked_change(self) -> bool {
        matches!(self, FileStatus::Modified | FileStatus::Deleted)
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FileStatus::Untracked => "untracked",
            FileStatus::Modified => "modified",
            FileStatus::Deleted => "deleted",
            FileStatus::Unmodified => "unmodified",
            FileStatus::Conflicted => "both modified",
        };
        f.write_str(s)
    }
}

/// How a staged path will change in the next commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagedChange {
    New,
    Modified,
    Deleted,
}

impl std::fmt::Display for StagedChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StagedChange::New => "new file",
            StagedChange::Modified => "modified",
            StagedChange::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// Where HEAD is, described for `git status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadLabel {
    /// Not a repository yet.
    NoRepository,
    /// On a branch with no commits.
    Unborn(BranchName),
    OnBranch(BranchName),
    /// Detached at the given short hash.
    Detached(String),
}

/// Result of `git status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub head: HeadLabel,
    pub staged: Vec<(FilePath, StagedChange)>,
    /// Tracked paths with changes not staged for commit.
    pub unstaged: Vec<(FilePath, FileStatus)>,
    pub untracked: Vec<FilePath>,
    pub conflicts: Vec<FilePath>,
    /// Branch being merged, while a merge is unfinished.
    pub merging: Option<BranchName>,
}

impl StatusReport {
    /// Nothing staged, nothing modified, nothing untracked.
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty()
            && self.unstaged.is_empty()
            && self.untracked.is_empty()
            && self.conflicts.is_empty()
    }

    /// Render the report the way `git status` prints it.
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::new();

        match &self.head {
            HeadLabel::NoRepository => {
                out.push("fatal: not a git repository (run 'git init' first)".to_string());
                return out;
            }
            HeadLabel::Unborn(branch) => {
                out.push(format!("On branch {branch}"));
                out.push(String::new());
                out.push("No commits yet".to_string());
            }
            HeadLabel::OnBranch(branch) => out.push(format!("On branch {branch}")),
            HeadLabel::Detached(hash) => out.push(format!("HEAD detached at {hash}")),
        }

        if let Some(branch) = &self.merging {
            if self.conflicts.is_empty() {
                out.push(format!(
                    "All conflicts fixed but you are still merging '{branch}'."
                ));
                out.push("  (use \"git commit\" to conclude merge)".to_string());
            } else {
                out.push(format!("You have unmerged paths from '{branch}'."));
                out.push("  (fix conflicts and run \"git commit\")".to_string());
                out.push("  (use \"git merge --abort\" to abort the merge)".to_string());
            }
        }

        if !self.staged.is_empty() {
            out.push(String::new());
            out.push("Changes to be committed:".to_string());
            for (path, change) in &self.staged {
                out.push(format!("\t{:<12}{path}", format!("{change}:")));
            }
        }

        if !self.conflicts.is_empty() {
            out.push(String::new());
            out.push("Unmerged paths:".to_string());
            out.push("  (use \"git add <file>...\" to mark resolution)".to_string());
            for path in &self.conflicts {
                out.push(format!("\tboth modified: {path}"));
            }
        }

        if !self.unstaged.is_empty() {
            out.push(String::new());
            out.push("Changes not staged for commit:".to_string());
            for (path, status) in &self.unstaged {
                out.push(format!("\t{:<12}{path}", format!("{status}:")));
            }
        }

        if !self.untracked.is_empty() {
            out.push(String::new());
            out.push("Untracked files:".to_string());
            out.push("  (use \"git add <file>...\" to include in what will be committed)".to_string());
            for path in &self.untracked {
                out.push(format!("\t{path}"));
            }
        }

        if self.is_clean() && self.merging.is_none() {
            out.push(String::new());
            out.push("nothing to commit, working tree clean".to_string());
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_covers_all_combinations() {
        assert_eq!(FileStatus::derive(None, None), None);
        assert_eq!(FileStatus::derive(None, Some("x")), Some(FileStatus::Untracked));
        assert_eq!(FileStatus::derive(Some("x"), None), Some(FileStatus::Deleted));
        assert_eq!(
            FileStatus::derive(Some("x"), Some("x")),
            Some(FileStatus::Unmodified)
        );
        assert_eq!(
            FileStatus::derive(Some("x"), Some("y")),
            Some(FileStatus::Modified)
        );
    }

    #[test]
    fn tracked_changes() {
        assert!(FileStatus::Modified.is_tracked_change());
        assert!(FileStatus::Deleted.is_tracked_change());
        assert!(!FileStatus::Untracked.is_tracked_change());
        assert!(FileStatus::Untracked.is_change());
        assert!(!FileStatus::Unmodified.is_change());
    }

    #[test]
    fn clean_report_says_so() {
        let report = StatusReport {
            head: HeadLabel::OnBranch(BranchName::main()),
            staged: vec![],
            unstaged: vec![],
            untracked: vec![],
            conflicts: vec![],
            merging: None,
        };
        let lines = report.lines();
        assert_eq!(lines[0], "On branch main");
        assert!(lines.iter().any(|l| l.contains("working tree clean")));
    }

    #[test]
    fn report_lists_sections() {
        let path = FilePath::new("a.txt").unwrap();
        let report = StatusReport {
            head: HeadLabel::Unborn(BranchName::main()),
            staged: vec![(path.clone(), StagedChange::New)],
            unstaged: vec![],
            untracked: vec![FilePath::new("b.txt").unwrap()],
            conflicts: vec![],
            merging: None,
        };
        let text = report.lines().join("\n");
        assert!(text.contains("No commits yet"));
        assert!(text.contains("Changes to be committed:"));
        assert!(text.contains("new file:   a.txt"));
        assert!(text.contains("Untracked files:"));
        assert!(!text.contains("working tree clean"));
    }
}
