//! core::graph
//!
//! Commit graph representation and traversal.
//!
//! # Architecture
//!
//! The commit graph is a DAG where:
//! - Nodes are commit ids
//! - Edges point from child to parent (first parent first)
//! - Roots are commits without parents
//!
//! # Invariants
//!
//! - Graph must be acyclic
//! - Every parent referenced by a node is itself a node
//!
//! The repository maintains both invariants by construction; [`CommitGraph`]
//! exposes the checks so that [`crate::core::verify`] can prove it.

use super::entity::Commit;
use super::types::EntityId;
use std::collections::{HashMap, HashSet, VecDeque};

/// The commit graph derived from a repository's commit list.
#[derive(Debug, Default, Clone)]
pub struct CommitGraph {
    /// Parent lists for each commit, in recorded order
    parents: HashMap<EntityId, Vec<EntityId>>,
    /// Insertion order, oldest first
    order: Vec<EntityId>,
}

impl CommitGraph {
    /// Create an empty commit graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from commits in creation order.
    pub fn from_commits<'a>(commits: impl IntoIterator<Item = &'a Commit>) -> Self {
        let mut graph = Self::new();
        for commit in commits {
            graph.add_node(commit.id.clone(), commit.parents.clone());
        }
        graph
    }

    /// Add a commit with its parents.
    pub fn add_node(&mut self, id: EntityId, parents: Vec<EntityId>) {
        if self.parents.insert(id.clone(), parents).is_none() {
            self.order.push(id);
        }
    }

    /// Whether the commit is part of the graph.
    pub fn contains(&self, id: &EntityId) -> bool {
        self.parents.contains_key(id)
    }

    /// Get the parents of a commit.
    pub fn parents(&self, id: &EntityId) -> &[EntityId] {
        self.parents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of commits.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the graph has no commits.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Commits in insertion order, oldest first.
    pub fn commits(&self) -> impl Iterator<Item = &EntityId> {
        self.order.iter()
    }

    /// Find a parent reference that does not name a commit in the graph.
    ///
    /// Returns `(child, missing_parent)` for the first dangling edge.
    pub fn find_dangling_parent(&self) -> Option<(EntityId, EntityId)> {
        for id in &self.order {
            for parent in self.parents(id) {
                if !self.contains(parent) {
                    return Some((id.clone(), parent.clone()));
                }
            }
        }
        None
    }

    /// Check if the graph contains cycles.
    ///
    /// Returns `Some(commit)` if a cycle is reachable from that commit.
    pub fn find_cycle(&self) -> Option<EntityId> {
        let mut visited = HashSet::new();
        let mut path = HashSet::new();

        for id in &self.order {
            if self.has_cycle_from(id, &mut visited, &mut path) {
                return Some(id.clone());
            }
        }
        None
    }

    fn has_cycle_from(
        &self,
        id: &EntityId,
        visited: &mut HashSet<EntityId>,
        path: &mut HashSet<EntityId>,
    ) -> bool {
        if path.contains(id) {
            return true;
        }
        if visited.contains(id) {
            return false;
        }

        visited.insert(id.clone());
        path.insert(id.clone());

        for parent in self.parents(id) {
            if self.has_cycle_from(parent, visited, path) {
                return true;
            }
        }

        path.remove(id);
        false
    }

    /// All commits reachable from `id`, including `id` itself.
    pub fn reachable(&self, id: &EntityId) -> HashSet<EntityId> {
        let mut result = HashSet::new();
        let mut queue = VecDeque::from([id.clone()]);

        while let Some(current) = queue.pop_front() {
            if result.insert(current.clone()) {
                queue.extend(self.parents(&current).iter().cloned());
            }
        }

        result
    }

    /// Whether `ancestor` is reachable from `descendant`.
    ///
    /// A commit counts as its own ancestor.
    pub fn is_ancestor(&self, ancestor: &EntityId, descendant: &EntityId) -> bool {
        self.reachable(descendant).contains(ancestor)
    }

    /// Best common ancestor of two commits.
    ///
    /// Among the commits reachable from both sides, picks the one created
    /// last (the graph is append-only, so insertion order is a valid
    /// topological order). Returns `None` for unrelated histories.
    pub fn merge_base(&self, a: &EntityId, b: &EntityId) -> Option<EntityId> {
        let from_a = self.reachable(a);
        let from_b = self.reachable(b);

        self.order
            .iter()
            .rev()
            .find(|id| from_a.contains(*id) && from_b.contains(*id))
            .cloned()
    }

    /// Walk first parents from `id` back to a root, newest first.
    pub fn first_parent_chain(&self, id: &EntityId) -> Vec<EntityId> {
        let mut result = Vec::new();
        let mut current = Some(id.clone());

        while let Some(commit) = current {
            if !self.contains(&commit) || result.contains(&commit) {
                break;
            }
            current = self.parents(&commit).first().cloned();
            result.push(commit);
        }

        result
    }
}
