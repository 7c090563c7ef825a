//! core::entity
//!
//! Value objects for the things drawn in the commit graph.
//!
//! # Entities
//!
//! - [`Commit`] - A snapshot of the file tree with zero, one or two parents
//! - [`Branch`] - A movable pointer to a commit
//! - [`Tag`] - A fixed pointer to a commit
//!
//! [`GitEntity`] is the sum type over all three, used wherever the renderer
//! or the interpreter must handle "some object" exhaustively.
//!
//! # Identity
//!
//! Every entity gets a fresh [`EntityId`] and a creation timestamp from its
//! factory function. Equality and hashing use the id only: two commits with
//! the same message and tree are still different commits.
//!
//! Entities know nothing about the repository that holds them.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::types::{BranchName, ContentHash, EntityId, FilePath, TagName, UtcTimestamp};

/// File contents of a commit, keyed by path.
pub type Tree = BTreeMap<FilePath, String>;

/// Kind tag for [`GitEntity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Commit,
    Branch,
    Tag,
}

impl EntityKind {
    /// Prefix used for generated ids of this kind.
    pub fn id_prefix(self) -> &'static str {
        match self {
            EntityKind::Commit => "commit",
            EntityKind::Branch => "branch",
            EntityKind::Tag => "tag",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id_prefix())
    }
}

/// A commit in the simulated history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub id: EntityId,
    pub created_at: UtcTimestamp,
    pub message: String,
    pub hash: ContentHash,
    /// First parent is the commit HEAD pointed at; a second parent marks a merge.
    pub parents: Vec<EntityId>,
    pub tree: Tree,
}

impl Commit {
    /// Whether this commit has no parents.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Whether this commit joins two lines of history.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Seven-character hash, as shown by `git log --oneline`.
    pub fn short_hash(&self) -> &str {
        self.hash.short(7)
    }
}

impl PartialEq for Commit {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Commit {}

impl Hash for Commit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A branch: a named pointer that moves forward on commit and merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: EntityId,
    pub created_at: UtcTimestamp,
    pub name: BranchName,
    pub target: EntityId,
}

impl Branch {
    /// Point the branch at a different commit.
    pub fn move_to(&mut self, target: EntityId) {
        self.target = target;
    }
}

impl PartialEq for Branch {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Branch {}

impl Hash for Branch {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A tag: a named pointer fixed at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: EntityId,
    pub created_at: UtcTimestamp,
    pub name: TagName,
    target: EntityId,
}

impl Tag {
    /// The commit this tag names.
    pub fn target(&self) -> &EntityId {
        &self.target
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Any object that can appear in the commit graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GitEntity {
    Commit(Commit),
    Branch(Branch),
    Tag(Tag),
}

impl GitEntity {
    pub fn id(&self) -> &EntityId {
        match self {
            GitEntity::Commit(c) => &c.id,
            GitEntity::Branch(b) => &b.id,
            GitEntity::Tag(t) => &t.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            GitEntity::Commit(_) => EntityKind::Commit,
            GitEntity::Branch(_) => EntityKind::Branch,
            GitEntity::Tag(_) => EntityKind::Tag,
        }
    }

    pub fn created_at(&self) -> &UtcTimestamp {
        match self {
            GitEntity::Commit(c) => &c.created_at,
            GitEntity::Branch(b) => &b.created_at,
            GitEntity::Tag(t) => &t.created_at,
        }
    }

    /// The commit this entity resolves to.
    pub fn commit_id(&self) -> &EntityId {
        match self {
            GitEntity::Commit(c) => &c.id,
            GitEntity::Branch(b) => &b.target,
            GitEntity::Tag(t) => t.target(),
        }
    }

    /// Label shown next to the target commit in a decorated log.
    ///
    /// Commits are not refs and carry no label.
    pub fn ref_label(&self) -> Option<String> {
        match self {
            GitEntity::Commit(_) => None,
            GitEntity::Branch(b) => Some(b.name.to_string()),
            GitEntity::Tag(t) => Some(format!("tag: {}", t.name)),
        }
    }
}

/// Create a commit.
///
/// The simulated hash covers the message, parents, tree, timestamp and a
/// random nonce (the id), so identical content committed twice still yields
/// two distinct hashes.
///
/// # Example
///
/// ```
/// use gitcoach::core::entity::{create_commit, Tree};
///
/// let root = create_commit("Initial commit", vec![], Tree::new());
/// let next = create_commit("Second", vec![root.id.clone()], Tree::new());
/// assert!(root.is_root());
/// assert_eq!(next.parents, vec![root.id.clone()]);
/// assert_ne!(root.hash, next.hash);
/// ```
pub fn create_commit(message: impl Into<String>, parents: Vec<EntityId>, tree: Tree) -> Commit {
    let message = message.into();
    let id = EntityId::generate(EntityKind::Commit.id_prefix());
    let created_at = UtcTimestamp::now();

    let created = created_at.to_string();
    let mut parts: Vec<&str> = vec![id.as_str(), created.as_str(), message.as_str()];
    parts.extend(parents.iter().map(EntityId::as_str));
    for (path, content) in &tree {
        parts.push(path.as_str());
        parts.push(content.as_str());
    }
    let hash = ContentHash::compute(&parts);

    Commit {
        id,
        created_at,
        message,
        hash,
        parents,
        tree,
    }
}

/// Create a branch pointing at `source`.
pub fn create_branch(name: BranchName, source: EntityId) -> Branch {
    Branch {
        id: EntityId::generate(EntityKind::Branch.id_prefix()),
        created_at: UtcTimestamp::now(),
        name,
        target: source,
    }
}

/// Create a tag fixed at `target`.
pub fn create_tag(name: TagName, target: EntityId) -> Tag {
    Tag {
        id: EntityId::generate(EntityKind::Tag.id_prefix()),
        created_at: UtcTimestamp::now(),
        name,
        target,
    }
}
