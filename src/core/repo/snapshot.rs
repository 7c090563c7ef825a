//! core::repo::snapshot
//!
//! Serializable views of repository state.
//!
//! - [`RepoSnapshot`] is what the renderer and the scenario predicate see.
//!   It is a plain copy: holding one never borrows the live repository.
//! - [`RemoteSnapshot`], [`RepoSeed`] and [`SeedCommit`] describe history
//!   copied into a repository by `git clone` or by a step's initial state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::status::FileStatus;
use crate::core::entity::{Commit, GitEntity};
use crate::core::types::{BranchName, EntityId, FilePath, TagName};

/// Where HEAD points, in a form that serializes cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HeadView {
    /// On a branch that has no commits yet.
    Unborn { branch: BranchName },
    /// On a branch.
    Branch { branch: BranchName, commit: EntityId },
    /// Directly on a commit.
    Detached { commit: EntityId },
}

impl HeadView {
    pub fn branch(&self) -> Option<&BranchName> {
        match self {
            HeadView::Unborn { branch } | HeadView::Branch { branch, .. } => Some(branch),
            HeadView::Detached { .. } => None,
        }
    }

    pub fn commit(&self) -> Option<&EntityId> {
        match self {
            HeadView::Unborn { .. } => None,
            HeadView::Branch { commit, .. } | HeadView::Detached { commit } => Some(commit),
        }
    }
}

/// One entry of the working tree as shown to consumers.
///
/// Deleted files appear with `content: None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingFileView {
    pub content: Option<String>,
    pub status: FileStatus,
    pub staged: bool,
}

/// Complete copy of a repository's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoSnapshot {
    pub initialized: bool,
    pub head: HeadView,
    /// Commits in creation order.
    pub commits: Vec<Commit>,
    pub branches: BTreeMap<BranchName, EntityId>,
    pub tags: BTreeMap<TagName, EntityId>,
    pub working_tree: BTreeMap<FilePath, WorkingFileView>,
    pub staged: Vec<FilePath>,
    pub conflicts: Vec<FilePath>,
    /// Branch whose merge is waiting for conflict resolution.
    pub merging: Option<BranchName>,
    /// Branches merged into this repository, oldest first.
    pub merged_branches: Vec<BranchName>,
    /// URL this repository was cloned from.
    pub origin: Option<String>,
    /// Whether a merge in this repository ever stopped on conflicts.
    pub conflict_seen: bool,
    /// Ref labels per commit.
    #[serde(default)]
    pub decorations: BTreeMap<EntityId, Vec<String>>,
}

impl RepoSnapshot {
    /// Paths whose working-tree status matches `status`.
    pub fn files_with_status(&self, status: FileStatus) -> Vec<&FilePath> {
        self.working_tree
            .iter()
            .filter(|(_, f)| f.status == status)
            .map(|(p, _)| p)
            .collect()
    }

    /// Look up a commit by id.
    pub fn commit(&self, id: &EntityId) -> Option<&Commit> {
        self.commits.iter().find(|c| &c.id == id)
    }

    /// Ref labels per commit, as `git log --decorate` prints them.
    pub fn decorations(&self) -> &BTreeMap<EntityId, Vec<String>> {
        &self.decorations
    }
}

/// Label every commit that HEAD or a ref points at.
///
/// The HEAD label comes first, then refs in the order given.
pub fn decorate(
    head: &HeadView,
    refs: impl IntoIterator<Item = GitEntity>,
) -> BTreeMap<EntityId, Vec<String>> {
    let mut labels: BTreeMap<EntityId, Vec<String>> = BTreeMap::new();

    if let HeadView::Detached { commit } = head {
        labels.entry(commit.clone()).or_default().push("HEAD".to_string());
    }
    for entity in refs {
        let Some(label) = entity.ref_label() else {
            continue;
        };
        let entry = labels.entry(entity.commit_id().clone()).or_default();
        match &entity {
            GitEntity::Branch(branch) if head.branch() == Some(&branch.name) => {
                entry.insert(0, format!("HEAD -> {label}"));
            }
            _ => entry.push(label),
        }
    }

    labels
}

/// A commit to be replayed into a repository.
///
/// `files` are written on top of the previous commit's tree; `removed`
/// paths are dropped from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedCommit {
    pub message: String,
    pub files: BTreeMap<FilePath, String>,
    pub removed: Vec<FilePath>,
}

/// History and branches offered by a simulated remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteSnapshot {
    /// Branch checked out after cloning.
    pub default_branch: BranchName,
    /// Linear history, oldest first.
    pub history: Vec<SeedCommit>,
    /// Additional branches, all pointing at the newest commit.
    pub branches: Vec<BranchName>,
}

impl Default for RemoteSnapshot {
    fn default() -> Self {
        let mut files = BTreeMap::new();
        if let Ok(readme) = FilePath::new("README.md") {
            files.insert(readme, "# Team project\n".to_string());
        }
        Self {
            default_branch: BranchName::main(),
            history: vec![SeedCommit {
                message: "Initial commit".to_string(),
                files,
                removed: vec![],
            }],
            branches: vec![],
        }
    }
}

/// Starting state for a repository, applied before a step begins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepoSeed {
    /// Start with `git init` already done. Implied by a non-empty history.
    pub initialized: bool,
    /// Linear history on the default branch, oldest first.
    pub history: Vec<SeedCommit>,
    /// Extra branches pointing at the newest seeded commit.
    pub branches: Vec<BranchName>,
    /// Working-tree files written after the history is replayed.
    pub files: BTreeMap<FilePath, String>,
    /// Remote served to `git clone` during the step.
    pub remote: Option<RemoteSnapshot>,
}
