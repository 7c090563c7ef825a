//! core::repo
//!
//! The simulated repository: working tree, staging area, commit history,
//! branches, tags, HEAD and merge-conflict state.
//!
//! # Transitions
//!
//! The repository never interprets command strings. It exposes primitive
//! transitions (`init_repo`, `stage_file`, `commit`, `merge_branch`, ...)
//! that the interpreter calls. Every transition:
//!
//! 1. runs against a draft copy of the state,
//! 2. replaces the live state with the draft only on success,
//! 3. returns the [`Outcome`] together with a fresh [`RepoSnapshot`].
//!
//! A rejected transition therefore leaves the repository exactly as it was.
//!
//! # Invariants
//!
//! - Commits are append-only; every parent of a commit exists
//! - The commit graph is acyclic
//! - HEAD names an existing branch, an unborn branch, or a commit
//! - Conflict markers exist only while a merge is pending
//!
//! [`crate::core::verify`] checks these after each transition.
//!
//! # Example
//!
//! ```
//! use gitcoach::core::context::SessionContext;
//! use gitcoach::core::repo::Repository;
//! use gitcoach::core::types::FilePath;
//!
//! let mut repo = Repository::new(&SessionContext::default());
//! repo.init_repo().unwrap();
//!
//! let readme = FilePath::new("README.md").unwrap();
//! repo.write_file(&readme, "hello\n").unwrap();
//! repo.stage_file(&readme).unwrap();
//! let transition = repo.commit("Add README").unwrap();
//!
//! assert_eq!(transition.snapshot.commits.len(), 1);
//! assert!(transition.snapshot.staged.is_empty());
//! ```

pub mod merge;
pub mod snapshot;
pub mod status;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use thiserror::Error;

use self::merge::merge_trees;
use self::snapshot::{
    decorate, HeadView, RemoteSnapshot, RepoSeed, RepoSnapshot, SeedCommit, WorkingFileView,
};
use self::status::{FileStatus, HeadLabel, StagedChange, StatusReport};
use super::context::SessionContext;
use super::entity::{create_branch, create_commit, create_tag, Branch, Commit, GitEntity, Tag, Tree};
use super::graph::CommitGraph;
use super::types::{BranchName, EntityId, FilePath, TagName};
use super::verify;
use super::ErrorKind;

/// Errors from repository transitions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepoError {
    #[error("not a git repository (run 'git init' first)")]
    NotARepository,

    #[error("a repository already exists here")]
    AlreadyInitialized,

    #[error("commit message cannot be empty")]
    EmptyMessage,

    #[error("nothing to commit (use \"git add\" to stage changes)")]
    NothingToCommit,

    #[error("branch '{0}' not found")]
    BranchNotFound(BranchName),

    #[error("a branch named '{0}' already exists")]
    BranchExists(BranchName),

    #[error("cannot delete branch '{0}': it is checked out")]
    BranchCheckedOut(BranchName),

    #[error("branch '{0}' is not fully merged (use -D to delete it anyway)")]
    BranchNotMerged(BranchName),

    #[error("tag '{0}' not found")]
    TagNotFound(TagName),

    #[error("tag '{0}' already exists")]
    TagExists(TagName),

    #[error("'{0}' is not a branch, tag or commit")]
    UnknownRevision(String),

    #[error("branch '{0}' does not have any commits yet")]
    NoCommits(BranchName),

    #[error("pathspec '{0}' did not match any files")]
    PathNotFound(FilePath),

    #[error("'{0}' is not staged")]
    NotStaged(FilePath),

    #[error("'{0}' has no merge conflict")]
    NotConflicted(FilePath),

    #[error("there is no merge to abort")]
    NoMergeInProgress,

    #[error("refusing to merge unrelated histories")]
    UnrelatedHistories,

    #[error("unresolved conflicts in: {}", join_paths(.0))]
    UnresolvedConflicts(Vec<FilePath>),

    #[error("merge of '{0}' is not concluded (run \"git commit\")")]
    MergeInProgress(BranchName),

    #[error("local changes would be overwritten: {}", join_paths(.0))]
    LocalChanges(Vec<FilePath>),
}

impl RepoError {
    /// The category reported to the presentation layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepoError::NotARepository => ErrorKind::NotARepository,
            RepoError::AlreadyInitialized | RepoError::BranchExists(_) | RepoError::TagExists(_) => {
                ErrorKind::AlreadyExists
            }
            RepoError::EmptyMessage => ErrorKind::InvalidArguments,
            RepoError::NothingToCommit => ErrorKind::NothingToCommit,
            RepoError::BranchNotFound(_)
            | RepoError::BranchCheckedOut(_)
            | RepoError::BranchNotMerged(_)
            | RepoError::TagNotFound(_)
            | RepoError::UnknownRevision(_)
            | RepoError::NoCommits(_)
            | RepoError::PathNotFound(_)
            | RepoError::NotStaged(_)
            | RepoError::NotConflicted(_)
            | RepoError::NoMergeInProgress
            | RepoError::UnrelatedHistories => ErrorKind::InvalidTarget,
            RepoError::UnresolvedConflicts(_) | RepoError::MergeInProgress(_) => {
                ErrorKind::ConflictPending
            }
            RepoError::LocalChanges(_) => ErrorKind::DirtyWorkingTree,
        }
    }
}

fn join_paths(paths: &[FilePath]) -> String {
    paths
        .iter()
        .map(FilePath::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Where HEAD points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// On a branch that does not exist yet (no commits).
    Unborn(BranchName),
    /// On an existing branch.
    Branch(BranchName),
    /// Directly on a commit.
    Detached(EntityId),
}

/// A merge stopped on conflicts, waiting for resolution.
#[derive(Debug, Clone)]
struct PendingMerge {
    branch: BranchName,
    theirs: EntityId,
    /// Working tree before the merge, restored by `merge --abort`.
    restore: BTreeMap<FilePath, String>,
}

/// What a successful transition did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Initialized {
        branch: BranchName,
    },
    Reinitialized,
    Staged {
        staged: Vec<FilePath>,
        resolved: Vec<FilePath>,
    },
    Unstaged(Vec<FilePath>),
    Committed {
        branch: Option<BranchName>,
        short_hash: String,
        summary: String,
        root: bool,
        merge: bool,
        files_changed: usize,
    },
    BranchCreated {
        name: BranchName,
        short_hash: String,
    },
    BranchDeleted {
        name: BranchName,
        short_hash: String,
    },
    SwitchedBranch {
        name: BranchName,
        created: bool,
    },
    AlreadyOnBranch(BranchName),
    Detached {
        short_hash: String,
    },
    Merged {
        branch: BranchName,
        short_hash: String,
    },
    AlreadyUpToDate {
        branch: BranchName,
    },
    /// The merge stopped; HEAD did not move.
    MergeConflict {
        branch: BranchName,
        paths: Vec<FilePath>,
    },
    MergeAborted {
        branch: BranchName,
    },
    Tagged {
        name: TagName,
        short_hash: String,
    },
    TagDeleted {
        name: TagName,
    },
    Cloned {
        url: String,
        branch: BranchName,
        commits: usize,
    },
    FileWritten {
        path: FilePath,
        created: bool,
    },
    FilesRemoved(Vec<FilePath>),
}

impl Outcome {
    /// Whether this outcome left the repository in conflict mode.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Outcome::MergeConflict { .. })
    }

    /// Terminal output for this outcome, in the voice of Git.
    pub fn lines(&self) -> Vec<String> {
        match self {
            Outcome::Initialized { branch } => vec![format!(
                "Initialized empty Git repository (default branch '{branch}')"
            )],
            Outcome::Reinitialized => vec!["Reinitialized existing Git repository".to_string()],
            Outcome::Staged { staged, resolved } => staged
                .iter()
                .map(|p| format!("add '{p}'"))
                .chain(resolved.iter().map(|p| format!("resolved '{p}'")))
                .collect(),
            Outcome::Unstaged(paths) => paths.iter().map(|p| format!("unstaged '{p}'")).collect(),
            Outcome::Committed {
                branch,
                short_hash,
                summary,
                root,
                files_changed,
                ..
            } => {
                let label = match branch {
                    Some(b) if *root => format!("{b} (root-commit)"),
                    Some(b) => b.to_string(),
                    None => "detached HEAD".to_string(),
                };
                let noun = if *files_changed == 1 { "file" } else { "files" };
                vec![
                    format!("[{label} {short_hash}] {summary}"),
                    format!(" {files_changed} {noun} changed"),
                ]
            }
            Outcome::BranchCreated { name, short_hash } => {
                vec![format!("Created branch '{name}' at {short_hash}")]
            }
            Outcome::BranchDeleted { name, short_hash } => {
                vec![format!("Deleted branch {name} (was {short_hash}).")]
            }
            Outcome::SwitchedBranch {
                name,
                created: true,
            } => vec![format!("Switched to a new branch '{name}'")],
            Outcome::SwitchedBranch { name, .. } => vec![format!("Switched to branch '{name}'")],
            Outcome::AlreadyOnBranch(name) => vec![format!("Already on '{name}'")],
            Outcome::Detached { short_hash } => vec![
                format!("HEAD is now at {short_hash}"),
                "You are in 'detached HEAD' state.".to_string(),
            ],
            Outcome::Merged { branch, short_hash } => vec![format!(
                "Merged branch '{branch}' (merge commit {short_hash})"
            )],
            Outcome::AlreadyUpToDate { .. } => vec!["Already up to date.".to_string()],
            Outcome::MergeConflict { paths, .. } => paths
                .iter()
                .map(|p| format!("CONFLICT (content): Merge conflict in {p}"))
                .chain(std::iter::once(
                    "Automatic merge failed; fix conflicts and then commit the result.".to_string(),
                ))
                .collect(),
            Outcome::MergeAborted { branch } => vec![format!("Merge of '{branch}' aborted")],
            Outcome::Tagged { name, short_hash } => {
                vec![format!("Tagged {short_hash} as '{name}'")]
            }
            Outcome::TagDeleted { name } => vec![format!("Deleted tag '{name}'")],
            Outcome::Cloned {
                url,
                branch,
                commits,
            } => vec![
                format!("Cloning from '{url}'..."),
                format!("Received {commits} commit(s); checked out '{branch}'"),
            ],
            Outcome::FileWritten { .. } | Outcome::FilesRemoved(_) => vec![],
        }
    }
}

/// Result of a successful transition.
#[derive(Debug, Clone)]
pub struct Transition {
    pub outcome: Outcome,
    pub snapshot: RepoSnapshot,
}

/// A simulated Git repository.
#[derive(Debug, Clone)]
pub struct Repository {
    initialized: bool,
    default_branch: BranchName,
    files: BTreeMap<FilePath, String>,
    staged: BTreeSet<FilePath>,
    commits: Vec<Commit>,
    index: HashMap<EntityId, usize>,
    graph: CommitGraph,
    branches: BTreeMap<BranchName, Branch>,
    tags: BTreeMap<TagName, Tag>,
    head: Head,
    conflicts: BTreeSet<FilePath>,
    merge: Option<PendingMerge>,
    merged: Vec<BranchName>,
    origin: Option<String>,
    conflict_seen: bool,
}

impl Repository {
    /// Create an empty, uninitialized repository for a session.
    pub fn new(ctx: &SessionContext) -> Self {
        Self {
            initialized: false,
            default_branch: ctx.default_branch.clone(),
            files: BTreeMap::new(),
            staged: BTreeSet::new(),
            commits: Vec::new(),
            index: HashMap::new(),
            graph: CommitGraph::new(),
            branches: BTreeMap::new(),
            tags: BTreeMap::new(),
            head: Head::Unborn(ctx.default_branch.clone()),
            conflicts: BTreeSet::new(),
            merge: None,
            merged: Vec::new(),
            origin: None,
            conflict_seen: false,
        }
    }

    /// Create a repository pre-populated from a seed.
    ///
    /// A seed with history is always initialized. Seed files are written on
    /// top of the seeded tip, so they show up as untracked or modified.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::NoCommits` if the seed names branches but has no
    /// history to point them at.
    pub fn from_seed(ctx: &SessionContext, seed: &RepoSeed) -> Result<Self, RepoError> {
        let mut repo = Self::new(ctx);
        if seed.initialized || !seed.history.is_empty() {
            repo.initialized = true;
        }
        if !seed.history.is_empty() || !seed.branches.is_empty() {
            let default = repo.default_branch.clone();
            repo.seed_history(&default, &seed.history, &seed.branches)?;
        }
        for (path, content) in &seed.files {
            repo.files.insert(path.clone(), content.clone());
        }
        Ok(repo)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn head(&self) -> &Head {
        &self.head
    }

    /// Branch HEAD is on, including an unborn one. `None` when detached.
    pub fn current_branch(&self) -> Option<&BranchName> {
        match &self.head {
            Head::Unborn(name) | Head::Branch(name) => Some(name),
            Head::Detached(_) => None,
        }
    }

    /// Commit HEAD resolves to, if any.
    pub fn head_commit_id(&self) -> Option<&EntityId> {
        match &self.head {
            Head::Unborn(_) => None,
            Head::Branch(name) => self.branches.get(name).map(|b| &b.target),
            Head::Detached(id) => Some(id),
        }
    }

    pub fn head_commit(&self) -> Option<&Commit> {
        self.head_commit_id().and_then(|id| self.find_commit(id))
    }

    pub fn find_commit(&self, id: &EntityId) -> Option<&Commit> {
        self.index.get(id).map(|&i| &self.commits[i])
    }

    /// All commits in creation order.
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn graph(&self) -> &CommitGraph {
        &self.graph
    }

    pub fn branch(&self, name: &BranchName) -> Option<&Branch> {
        self.branches.get(name)
    }

    pub fn branches(&self) -> impl Iterator<Item = &Branch> {
        self.branches.values()
    }

    pub fn find_tag(&self, name: &TagName) -> Option<&Tag> {
        self.tags.get(name)
    }

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    /// Branches then tags, as entities.
    pub fn refs(&self) -> impl Iterator<Item = GitEntity> + '_ {
        self.branches
            .values()
            .cloned()
            .map(GitEntity::Branch)
            .chain(self.tags.values().cloned().map(GitEntity::Tag))
    }

    pub fn staged(&self) -> impl Iterator<Item = &FilePath> {
        self.staged.iter()
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &FilePath> {
        self.conflicts.iter()
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Branch being merged while a merge waits for resolution.
    pub fn merging(&self) -> Option<&BranchName> {
        self.merge.as_ref().map(|m| &m.branch)
    }

    pub fn merged_branches(&self) -> &[BranchName] {
        &self.merged
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Files currently in the working tree.
    pub fn files(&self) -> impl Iterator<Item = (&FilePath, &String)> {
        self.files.iter()
    }

    pub fn read_file(&self, path: &FilePath) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Status of one path, or `None` if it exists neither in HEAD nor on disk.
    pub fn file_status(&self, path: &FilePath) -> Option<FileStatus> {
        if self.conflicts.contains(path) {
            return Some(FileStatus::Conflicted);
        }
        let head = self.head_tree_ref().and_then(|t| t.get(path)).map(String::as_str);
        FileStatus::derive(head, self.read_file(path))
    }

    /// `git status`.
    pub fn status(&self) -> StatusReport {
        let mut report = StatusReport {
            head: HeadLabel::NoRepository,
            staged: vec![],
            unstaged: vec![],
            untracked: vec![],
            conflicts: vec![],
            merging: None,
        };
        if !self.initialized {
            return report;
        }

        report.head = match &self.head {
            Head::Unborn(name) => HeadLabel::Unborn(name.clone()),
            Head::Branch(name) => HeadLabel::OnBranch(name.clone()),
            Head::Detached(id) => HeadLabel::Detached(self.short_hash(id)),
        };
        report.conflicts = self.conflicts.iter().cloned().collect();
        report.merging = self.merging().cloned();

        for path in &self.staged {
            let change = match self.file_status(path) {
                Some(FileStatus::Untracked) => StagedChange::New,
                Some(FileStatus::Modified) => StagedChange::Modified,
                Some(FileStatus::Deleted) => StagedChange::Deleted,
                _ => continue,
            };
            report.staged.push((path.clone(), change));
        }

        for (path, status) in self.changed_paths() {
            if self.staged.contains(&path) {
                continue;
            }
            match status {
                FileStatus::Untracked => report.untracked.push(path),
                FileStatus::Modified | FileStatus::Deleted => report.unstaged.push((path, status)),
                FileStatus::Unmodified | FileStatus::Conflicted => {}
            }
        }

        report
    }

    /// Commits reachable from HEAD, newest first.
    pub fn log(&self) -> Vec<&Commit> {
        let Some(head) = self.head_commit_id() else {
            return vec![];
        };
        let reachable = self.graph.reachable(head);
        self.commits
            .iter()
            .rev()
            .filter(|c| reachable.contains(&c.id))
            .collect()
    }

    /// Find the entity a revision names: `HEAD`, a branch, a tag, a commit
    /// id or a hash prefix of at least four characters.
    ///
    /// `HEAD` names the commit it points at.
    pub fn lookup(&self, rev: &str) -> Result<GitEntity, RepoError> {
        if rev == "HEAD" {
            return self
                .head_commit()
                .cloned()
                .map(GitEntity::Commit)
                .ok_or_else(|| self.no_commits());
        }
        if let Some(branch) = BranchName::new(rev).ok().and_then(|n| self.branches.get(&n)) {
            return Ok(GitEntity::Branch(branch.clone()));
        }
        if let Some(tag) = TagName::new(rev).ok().and_then(|n| self.tags.get(&n)) {
            return Ok(GitEntity::Tag(tag.clone()));
        }
        if let Some(commit) = self.commits.iter().find(|c| c.id.as_str() == rev) {
            return Ok(GitEntity::Commit(commit.clone()));
        }
        if rev.len() >= 4 && rev.chars().all(|c| c.is_ascii_hexdigit()) {
            let needle = rev.to_ascii_lowercase();
            let mut matches = self
                .commits
                .iter()
                .filter(|c| c.hash.as_str().starts_with(&needle));
            if let (Some(found), None) = (matches.next(), matches.next()) {
                return Ok(GitEntity::Commit(found.clone()));
            }
        }
        Err(RepoError::UnknownRevision(rev.to_string()))
    }

    /// Resolve a revision to the commit it names.
    pub fn resolve(&self, rev: &str) -> Result<EntityId, RepoError> {
        self.lookup(rev).map(|entity| entity.commit_id().clone())
    }

    /// Copy the full state for consumers.
    pub fn snapshot(&self) -> RepoSnapshot {
        let head = match &self.head {
            Head::Unborn(branch) => HeadView::Unborn {
                branch: branch.clone(),
            },
            Head::Branch(branch) => HeadView::Branch {
                branch: branch.clone(),
                commit: self.branches[branch].target.clone(),
            },
            Head::Detached(commit) => HeadView::Detached {
                commit: commit.clone(),
            },
        };

        let mut working_tree = BTreeMap::new();
        for path in self.known_paths() {
            if let Some(status) = self.file_status(&path) {
                let view = WorkingFileView {
                    content: self.files.get(&path).cloned(),
                    status,
                    staged: self.staged.contains(&path),
                };
                working_tree.insert(path, view);
            }
        }

        let decorations = decorate(&head, self.refs());
        RepoSnapshot {
            initialized: self.initialized,
            head,
            commits: self.commits.clone(),
            branches: self
                .branches
                .iter()
                .map(|(name, b)| (name.clone(), b.target.clone()))
                .collect(),
            tags: self
                .tags
                .iter()
                .map(|(name, t)| (name.clone(), t.target().clone()))
                .collect(),
            working_tree,
            staged: self.staged.iter().cloned().collect(),
            conflicts: self.conflicts.iter().cloned().collect(),
            merging: self.merging().cloned(),
            merged_branches: self.merged.clone(),
            origin: self.origin.clone(),
            conflict_seen: self.conflict_seen,
            decorations,
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// `git init`. Re-running it is harmless.
    pub fn init_repo(&mut self) -> Result<Transition, RepoError> {
        self.run("init", |repo| {
            if repo.initialized {
                return Ok(Outcome::Reinitialized);
            }
            repo.initialized = true;
            repo.head = Head::Unborn(repo.default_branch.clone());
            Ok(Outcome::Initialized {
                branch: repo.default_branch.clone(),
            })
        })
    }

    /// Stage one path. Staging a conflicted path resolves it.
    pub fn stage_file(&mut self, path: &FilePath) -> Result<Transition, RepoError> {
        self.stage_files(std::slice::from_ref(path))
    }

    /// Stage several paths at once; all or none.
    pub fn stage_files(&mut self, paths: &[FilePath]) -> Result<Transition, RepoError> {
        self.run("stage", |repo| {
            repo.require_init()?;
            let mut staged = Vec::new();
            let mut resolved = Vec::new();
            for path in paths {
                if repo.conflicts.remove(path) {
                    repo.staged.insert(path.clone());
                    resolved.push(path.clone());
                    continue;
                }
                match repo.file_status(path) {
                    None => return Err(RepoError::PathNotFound(path.clone())),
                    Some(FileStatus::Unmodified) => {
                        repo.staged.remove(path);
                    }
                    Some(_) => {
                        if repo.staged.insert(path.clone()) {
                            staged.push(path.clone());
                        }
                    }
                }
            }
            Ok(Outcome::Staged { staged, resolved })
        })
    }

    /// `git add .`: stage every change, resolving conflicted paths.
    pub fn stage_all(&mut self) -> Result<Transition, RepoError> {
        self.run("stage-all", |repo| {
            repo.require_init()?;
            let mut staged = Vec::new();
            let mut resolved = Vec::new();
            for (path, status) in repo.changed_paths() {
                if status == FileStatus::Conflicted {
                    repo.conflicts.remove(&path);
                    repo.staged.insert(path.clone());
                    resolved.push(path);
                } else if repo.staged.insert(path.clone()) {
                    staged.push(path);
                }
            }
            Ok(Outcome::Staged { staged, resolved })
        })
    }

    /// Remove one path from the staging area.
    pub fn unstage_file(&mut self, path: &FilePath) -> Result<Transition, RepoError> {
        self.unstage_files(std::slice::from_ref(path))
    }

    /// Remove several paths from the staging area; all or none.
    pub fn unstage_files(&mut self, paths: &[FilePath]) -> Result<Transition, RepoError> {
        self.run("unstage", |repo| {
            repo.require_init()?;
            for path in paths {
                if !repo.staged.remove(path) {
                    return Err(RepoError::NotStaged(path.clone()));
                }
            }
            Ok(Outcome::Unstaged(paths.to_vec()))
        })
    }

    /// Mark a conflicted path as resolved and stage it.
    pub fn resolve_conflict(&mut self, path: &FilePath) -> Result<Transition, RepoError> {
        self.run("resolve", |repo| {
            repo.require_init()?;
            if !repo.conflicts.remove(path) {
                return Err(RepoError::NotConflicted(path.clone()));
            }
            repo.staged.insert(path.clone());
            Ok(Outcome::Staged {
                staged: vec![],
                resolved: vec![path.clone()],
            })
        })
    }

    /// Commit the staging area.
    ///
    /// Committing with nothing staged is rejected with
    /// `RepoError::NothingToCommit`, except when concluding a merge.
    pub fn commit(&mut self, message: &str) -> Result<Transition, RepoError> {
        self.commit_with(message, false)
    }

    /// Commit, optionally staging all tracked changes first (`commit -a`).
    pub fn commit_with(&mut self, message: &str, all: bool) -> Result<Transition, RepoError> {
        self.run("commit", |repo| repo.apply_commit(message, all))
    }

    /// `git branch <name> [<start>]`.
    pub fn create_branch(
        &mut self,
        name: &BranchName,
        start: Option<&str>,
    ) -> Result<Transition, RepoError> {
        self.run("branch", |repo| repo.apply_create_branch(name, start))
    }

    /// `git branch -d|-D <name>`.
    pub fn delete_branch(&mut self, name: &BranchName, force: bool) -> Result<Transition, RepoError> {
        self.run("branch-delete", |repo| {
            repo.require_init()?;
            let target = repo
                .branches
                .get(name)
                .map(|b| b.target.clone())
                .ok_or_else(|| RepoError::BranchNotFound(name.clone()))?;
            if repo.current_branch() == Some(name) {
                return Err(RepoError::BranchCheckedOut(name.clone()));
            }
            let merged = repo
                .head_commit_id()
                .is_some_and(|head| repo.graph.is_ancestor(&target, head));
            if !force && !merged {
                return Err(RepoError::BranchNotMerged(name.clone()));
            }
            repo.branches.remove(name);
            Ok(Outcome::BranchDeleted {
                name: name.clone(),
                short_hash: repo.short_hash(&target),
            })
        })
    }

    /// `git checkout <branch>`.
    pub fn switch_branch(&mut self, name: &BranchName) -> Result<Transition, RepoError> {
        self.run("switch", |repo| repo.apply_switch(name))
    }

    /// `git checkout <rev>`: a branch switches, anything else detaches HEAD.
    pub fn checkout(&mut self, rev: &str) -> Result<Transition, RepoError> {
        self.run("checkout", |repo| {
            repo.require_init()?;
            if let Ok(name) = BranchName::new(rev) {
                if repo.current_branch() == Some(&name) {
                    return repo.apply_switch(&name);
                }
            }
            let target = match repo.lookup(rev)? {
                GitEntity::Branch(branch) => return repo.apply_switch(&branch.name),
                entity @ (GitEntity::Commit(_) | GitEntity::Tag(_)) => entity.commit_id().clone(),
            };
            repo.require_merge_settled()?;
            repo.checkout_tree(&target)?;
            repo.head = Head::Detached(target.clone());
            Ok(Outcome::Detached {
                short_hash: repo.short_hash(&target),
            })
        })
    }

    /// `git checkout -b <name> [<start>]`.
    pub fn create_and_switch(
        &mut self,
        name: &BranchName,
        start: Option<&str>,
    ) -> Result<Transition, RepoError> {
        self.run("switch-create", |repo| {
            repo.require_init()?;
            repo.require_merge_settled()?;
            if matches!(repo.head, Head::Unborn(_)) && start.is_none() {
                if repo.branches.contains_key(name) {
                    return Err(RepoError::BranchExists(name.clone()));
                }
                repo.head = Head::Unborn(name.clone());
                return Ok(Outcome::SwitchedBranch {
                    name: name.clone(),
                    created: true,
                });
            }
            repo.apply_create_branch(name, start)?;
            let target = repo.branches[name].target.clone();
            repo.checkout_tree(&target)?;
            repo.head = Head::Branch(name.clone());
            Ok(Outcome::SwitchedBranch {
                name: name.clone(),
                created: true,
            })
        })
    }

    /// `git merge <branch>`.
    ///
    /// Always records a two-parent merge commit when histories diverge or
    /// when HEAD is behind, so the graph shows where the branch joined.
    /// Overlapping changes stop the merge in conflict mode instead.
    pub fn merge_branch(&mut self, name: &BranchName) -> Result<Transition, RepoError> {
        self.run("merge", |repo| repo.apply_merge(name))
    }

    /// `git merge --abort`.
    pub fn abort_merge(&mut self) -> Result<Transition, RepoError> {
        self.run("merge-abort", |repo| {
            repo.require_init()?;
            let pending = repo.merge.take().ok_or(RepoError::NoMergeInProgress)?;
            repo.files = pending.restore;
            repo.conflicts.clear();
            repo.staged.clear();
            Ok(Outcome::MergeAborted {
                branch: pending.branch,
            })
        })
    }

    /// `git tag <name> [<target>]`. The target defaults to HEAD.
    pub fn tag(&mut self, name: &TagName, target: Option<&str>) -> Result<Transition, RepoError> {
        self.run("tag", |repo| {
            repo.require_init()?;
            if repo.tags.contains_key(name) {
                return Err(RepoError::TagExists(name.clone()));
            }
            let target = match target {
                Some(rev) => repo.resolve(rev)?,
                None => repo.resolve("HEAD")?,
            };
            let short_hash = repo.short_hash(&target);
            repo.tags.insert(name.clone(), create_tag(name.clone(), target));
            Ok(Outcome::Tagged {
                name: name.clone(),
                short_hash,
            })
        })
    }

    /// `git tag -d <name>`.
    pub fn delete_tag(&mut self, name: &TagName) -> Result<Transition, RepoError> {
        self.run("tag-delete", |repo| {
            repo.require_init()?;
            repo.tags
                .remove(name)
                .ok_or_else(|| RepoError::TagNotFound(name.clone()))?;
            Ok(Outcome::TagDeleted { name: name.clone() })
        })
    }

    /// `git clone <url>`: copy a remote snapshot into this empty repository.
    pub fn clone_from(&mut self, url: &str, remote: &RemoteSnapshot) -> Result<Transition, RepoError> {
        self.run("clone", |repo| {
            if repo.initialized {
                return Err(RepoError::AlreadyInitialized);
            }
            repo.initialized = true;
            repo.files.clear();
            repo.seed_history(&remote.default_branch, &remote.history, &remote.branches)?;
            repo.origin = Some(url.to_string());
            Ok(Outcome::Cloned {
                url: url.to_string(),
                branch: remote.default_branch.clone(),
                commits: remote.history.len(),
            })
        })
    }

    /// Overwrite (or create) a working-tree file.
    pub fn write_file(&mut self, path: &FilePath, content: &str) -> Result<Transition, RepoError> {
        self.run("write", |repo| {
            let created = repo
                .files
                .insert(path.clone(), content.to_string())
                .is_none();
            Ok(Outcome::FileWritten {
                path: path.clone(),
                created,
            })
        })
    }

    /// Append to (or create) a working-tree file.
    pub fn append_file(&mut self, path: &FilePath, content: &str) -> Result<Transition, RepoError> {
        self.run("append", |repo| {
            let created = !repo.files.contains_key(path);
            repo.files.entry(path.clone()).or_default().push_str(content);
            Ok(Outcome::FileWritten {
                path: path.clone(),
                created,
            })
        })
    }

    /// Delete working-tree files; all or none.
    pub fn remove_files(&mut self, paths: &[FilePath]) -> Result<Transition, RepoError> {
        self.run("remove", |repo| {
            for path in paths {
                if repo.files.remove(path).is_none() {
                    return Err(RepoError::PathNotFound(path.clone()));
                }
                let tracked = repo.head_tree_ref().is_some_and(|t| t.contains_key(path));
                if !tracked {
                    repo.staged.remove(path);
                }
            }
            Ok(Outcome::FilesRemoved(paths.to_vec()))
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Apply `f` to a draft and keep the draft only if `f` succeeds.
    fn run(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut Self) -> Result<Outcome, RepoError>,
    ) -> Result<Transition, RepoError> {
        let mut draft = self.clone();
        match f(&mut draft) {
            Ok(outcome) => {
                *self = draft;
                tracing::debug!(op, ?outcome, "transition applied");
                let report = verify::verify(self);
                if !report.ok {
                    tracing::error!(op, errors = ?report.errors, "repository invariants violated");
                }
                Ok(Transition {
                    outcome,
                    snapshot: self.snapshot(),
                })
            }
            Err(err) => {
                tracing::debug!(op, %err, "transition rejected");
                Err(err)
            }
        }
    }

    fn apply_commit(&mut self, message: &str, all: bool) -> Result<Outcome, RepoError> {
        self.require_init()?;
        let message = message.trim();
        if message.is_empty() {
            return Err(RepoError::EmptyMessage);
        }
        self.require_no_conflicts()?;

        if all {
            for (path, status) in self.changed_paths() {
                if status.is_tracked_change() {
                    self.staged.insert(path);
                }
            }
        }
        if self.staged.is_empty() && self.merge.is_none() {
            return Err(RepoError::NothingToCommit);
        }

        let head_tree = self.head_tree_ref().cloned().unwrap_or_default();
        let mut tree = head_tree.clone();
        for path in &self.staged {
            match self.files.get(path) {
                Some(content) => tree.insert(path.clone(), content.clone()),
                None => tree.remove(path),
            };
        }
        if tree == head_tree && self.merge.is_none() {
            return Err(RepoError::NothingToCommit);
        }

        let files_changed = tree
            .keys()
            .chain(head_tree.keys())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter(|p| tree.get(*p) != head_tree.get(*p))
            .count();

        let mut parents: Vec<EntityId> = self.head_commit_id().cloned().into_iter().collect();
        let root = parents.is_empty();
        let pending = self.merge.take();
        if let Some(merge) = &pending {
            parents.push(merge.theirs.clone());
        }

        let commit = create_commit(message, parents, tree);
        let short_hash = commit.short_hash().to_string();
        let summary = commit.summary().to_string();
        let id = commit.id.clone();
        self.push_commit(commit);
        let branch = self.advance_head(id);
        self.staged.clear();

        let merge = pending.is_some();
        if let Some(merge) = pending {
            self.record_merged(merge.branch);
        }

        Ok(Outcome::Committed {
            branch,
            short_hash,
            summary,
            root,
            merge,
            files_changed,
        })
    }

    fn apply_create_branch(&mut self, name: &BranchName, start: Option<&str>) -> Result<Outcome, RepoError> {
        self.require_init()?;
        if self.branches.contains_key(name) {
            return Err(RepoError::BranchExists(name.clone()));
        }
        let target = match start {
            Some(rev) => self.resolve(rev)?,
            None => self.resolve("HEAD")?,
        };
        let short_hash = self.short_hash(&target);
        self.branches
            .insert(name.clone(), create_branch(name.clone(), target));
        Ok(Outcome::BranchCreated {
            name: name.clone(),
            short_hash,
        })
    }

    fn apply_switch(&mut self, name: &BranchName) -> Result<Outcome, RepoError> {
        self.require_init()?;
        if self.current_branch() == Some(name) {
            return Ok(Outcome::AlreadyOnBranch(name.clone()));
        }
        let target = self
            .branches
            .get(name)
            .map(|b| b.target.clone())
            .ok_or_else(|| RepoError::BranchNotFound(name.clone()))?;
        self.require_merge_settled()?;
        self.checkout_tree(&target)?;
        self.head = Head::Branch(name.clone());
        Ok(Outcome::SwitchedBranch {
            name: name.clone(),
            created: false,
        })
    }

    fn apply_merge(&mut self, name: &BranchName) -> Result<Outcome, RepoError> {
        self.require_init()?;
        self.require_merge_settled()?;
        let theirs = self
            .branches
            .get(name)
            .map(|b| b.target.clone())
            .ok_or_else(|| RepoError::BranchNotFound(name.clone()))?;
        let ours = self.resolve("HEAD")?;

        if self.graph.is_ancestor(&theirs, &ours) {
            self.record_merged(name.clone());
            return Ok(Outcome::AlreadyUpToDate {
                branch: name.clone(),
            });
        }

        let mut dirty: BTreeSet<FilePath> = self.staged.clone();
        dirty.extend(
            self.changed_paths()
                .into_iter()
                .filter(|(_, s)| s.is_tracked_change())
                .map(|(p, _)| p),
        );
        if !dirty.is_empty() {
            return Err(RepoError::LocalChanges(dirty.into_iter().collect()));
        }

        let base = self
            .graph
            .merge_base(&ours, &theirs)
            .ok_or(RepoError::UnrelatedHistories)?;
        let base_tree = self.tree_of(&base);
        let our_tree = self.tree_of(&ours);
        let their_tree = self.tree_of(&theirs);
        let result = merge_trees(&base_tree, &our_tree, &their_tree, name.as_str());

        let untracked: BTreeMap<FilePath, String> = self
            .files
            .iter()
            .filter(|(p, _)| !our_tree.contains_key(*p))
            .map(|(p, c)| (p.clone(), c.clone()))
            .collect();
        let blocked: Vec<FilePath> = untracked
            .iter()
            .filter(|(p, c)| result.tree.get(*p).is_some_and(|merged| merged != *c))
            .map(|(p, _)| p.clone())
            .collect();
        if !blocked.is_empty() {
            return Err(RepoError::LocalChanges(blocked));
        }

        let mut files = result.tree.clone();
        for (path, content) in untracked {
            files.entry(path).or_insert(content);
        }

        if result.is_clean() {
            let commit = create_commit(
                format!("Merge branch '{name}'"),
                vec![ours, theirs],
                result.tree,
            );
            let short_hash = commit.short_hash().to_string();
            let id = commit.id.clone();
            self.push_commit(commit);
            self.advance_head(id);
            self.files = files;
            self.record_merged(name.clone());
            return Ok(Outcome::Merged {
                branch: name.clone(),
                short_hash,
            });
        }

        let conflicts: BTreeSet<FilePath> = result.conflicts.iter().cloned().collect();
        let changed: BTreeSet<FilePath> = result
            .tree
            .keys()
            .chain(our_tree.keys())
            .filter(|p| !conflicts.contains(*p) && result.tree.get(*p) != our_tree.get(*p))
            .cloned()
            .collect();

        let restore = std::mem::replace(&mut self.files, files);
        self.staged = changed;
        self.conflicts = conflicts;
        self.conflict_seen = true;
        self.merge = Some(PendingMerge {
            branch: name.clone(),
            theirs,
            restore,
        });

        Ok(Outcome::MergeConflict {
            branch: name.clone(),
            paths: result.conflicts,
        })
    }

    /// Replace tracked files with `target`'s tree, carrying local changes.
    ///
    /// Fails without touching anything if a local change sits on a path
    /// that differs between the current tree and `target`.
    fn checkout_tree(&mut self, target: &EntityId) -> Result<(), RepoError> {
        let current = self.head_tree_ref().cloned().unwrap_or_default();
        let next = self.tree_of(target);
        let changes = self.changed_paths();

        let blocked: Vec<FilePath> = changes
            .iter()
            .filter(|(path, status)| match status {
                FileStatus::Untracked => next
                    .get(path)
                    .is_some_and(|c| Some(c) != self.files.get(path)),
                _ => current.get(path) != next.get(path),
            })
            .map(|(p, _)| p.clone())
            .collect();
        if !blocked.is_empty() {
            return Err(RepoError::LocalChanges(blocked));
        }

        let mut files = next;
        for (path, _) in changes {
            match self.files.get(&path) {
                Some(content) => files.insert(path, content.clone()),
                None => files.remove(&path),
            };
        }
        self.files = files;
        Ok(())
    }

    /// Replay seed commits as a linear history on `default_branch`.
    fn seed_history(
        &mut self,
        default_branch: &BranchName,
        history: &[SeedCommit],
        branches: &[BranchName],
    ) -> Result<(), RepoError> {
        let mut tree = Tree::new();
        let mut tip: Option<EntityId> = None;

        for seed in history {
            for (path, content) in &seed.files {
                tree.insert(path.clone(), content.clone());
            }
            for path in &seed.removed {
                tree.remove(path);
            }
            let message = if seed.message.trim().is_empty() {
                "Update files"
            } else {
                seed.message.trim()
            };
            let commit = create_commit(message, tip.iter().cloned().collect(), tree.clone());
            tip = Some(commit.id.clone());
            self.push_commit(commit);
        }

        let Some(tip) = tip else {
            if branches.is_empty() {
                self.head = Head::Unborn(default_branch.clone());
                return Ok(());
            }
            return Err(RepoError::NoCommits(default_branch.clone()));
        };

        for name in std::iter::once(default_branch).chain(branches) {
            self.branches
                .entry(name.clone())
                .or_insert_with(|| create_branch(name.clone(), tip.clone()));
        }
        self.head = Head::Branch(default_branch.clone());
        self.files = tree;
        Ok(())
    }

    fn push_commit(&mut self, commit: Commit) {
        self.graph.add_node(commit.id.clone(), commit.parents.clone());
        self.index.insert(commit.id.clone(), self.commits.len());
        self.commits.push(commit);
    }

    /// Move HEAD (and the branch it is on) to a new commit.
    fn advance_head(&mut self, id: EntityId) -> Option<BranchName> {
        match self.head.clone() {
            Head::Unborn(name) => {
                self.branches
                    .insert(name.clone(), create_branch(name.clone(), id));
                self.head = Head::Branch(name.clone());
                Some(name)
            }
            Head::Branch(name) => {
                if let Some(branch) = self.branches.get_mut(&name) {
                    branch.move_to(id);
                }
                Some(name)
            }
            Head::Detached(_) => {
                self.head = Head::Detached(id);
                None
            }
        }
    }

    fn record_merged(&mut self, name: BranchName) {
        if self.current_branch() != Some(&name) && !self.merged.contains(&name) {
            self.merged.push(name);
        }
    }

    fn head_tree_ref(&self) -> Option<&Tree> {
        self.head_commit().map(|c| &c.tree)
    }

    fn tree_of(&self, id: &EntityId) -> Tree {
        self.find_commit(id).map(|c| c.tree.clone()).unwrap_or_default()
    }

    fn short_hash(&self, id: &EntityId) -> String {
        self.find_commit(id)
            .map(|c| c.short_hash().to_string())
            .unwrap_or_else(|| id.to_string())
    }

    /// Paths present in the working tree or in HEAD.
    fn known_paths(&self) -> BTreeSet<FilePath> {
        let mut paths: BTreeSet<FilePath> = self.files.keys().cloned().collect();
        if let Some(tree) = self.head_tree_ref() {
            paths.extend(tree.keys().cloned());
        }
        paths.extend(self.conflicts.iter().cloned());
        paths
    }

    /// Every path whose status differs from HEAD.
    fn changed_paths(&self) -> Vec<(FilePath, FileStatus)> {
        self.known_paths()
            .into_iter()
            .filter_map(|p| {
                let status = self.file_status(&p)?;
                status.is_change().then_some((p, status))
            })
            .collect()
    }

    fn no_commits(&self) -> RepoError {
        RepoError::NoCommits(
            self.current_branch()
                .cloned()
                .unwrap_or_else(|| self.default_branch.clone()),
        )
    }

    fn require_init(&self) -> Result<(), RepoError> {
        if self.initialized {
            Ok(())
        } else {
            Err(RepoError::NotARepository)
        }
    }

    fn require_no_conflicts(&self) -> Result<(), RepoError> {
        if self.conflicts.is_empty() {
            Ok(())
        } else {
            Err(RepoError::UnresolvedConflicts(
                self.conflicts.iter().cloned().collect(),
            ))
        }
    }

    /// No conflicts and no merge waiting for its commit.
    fn require_merge_settled(&self) -> Result<(), RepoError> {
        self.require_no_conflicts()?;
        match &self.merge {
            Some(merge) => Err(RepoError::MergeInProgress(merge.branch.clone())),
            None => Ok(()),
        }
    }
}
