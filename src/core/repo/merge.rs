//! core::repo::merge
//!
//! Three-way merge of file trees.
//!
//! Each path is decided independently from its base, ours and theirs
//! versions. A path changed on only one side takes that side; a path changed
//! identically on both sides takes the shared result; anything else is a
//! conflict and receives marker content in the merged tree.

use std::collections::BTreeSet;

use crate::core::entity::Tree;
use crate::core::types::FilePath;

/// Outcome of merging two trees against their base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeMerge {
    /// Merged tree. Conflicted paths hold marker content.
    pub tree: Tree,
    /// Paths changed on both sides in different ways.
    pub conflicts: Vec<FilePath>,
}

impl TreeMerge {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Merge `theirs` into `ours` relative to `base`.
///
/// `their_label` names the incoming side in conflict markers.
///
/// # Example
///
/// ```
/// use gitcoach::core::entity::Tree;
/// use gitcoach::core::repo::merge::merge_trees;
/// use gitcoach::core::types::FilePath;
///
/// let path = FilePath::new("a.txt").unwrap();
/// let mut base = Tree::new();
/// base.insert(path.clone(), "one\n".into());
/// let mut ours = base.clone();
/// ours.insert(path.clone(), "ours\n".into());
/// let mut theirs = base.clone();
/// theirs.insert(path.clone(), "theirs\n".into());
///
/// let merged = merge_trees(&base, &ours, &theirs, "feature");
/// assert_eq!(merged.conflicts, vec![path.clone()]);
/// assert!(merged.tree[&path].starts_with("<<<<<<< HEAD\n"));
/// ```
pub fn merge_trees(base: &Tree, ours: &Tree, theirs: &Tree, their_label: &str) -> TreeMerge {
    let paths: BTreeSet<&FilePath> = base.keys().chain(ours.keys()).chain(theirs.keys()).collect();

    let mut tree = Tree::new();
    let mut conflicts = Vec::new();

    for path in paths {
        let b = base.get(path);
        let o = ours.get(path);
        let t = theirs.get(path);

        let resolved = if o == t || t == b {
            o
        } else if o == b {
            t
        } else {
            conflicts.push(path.clone());
            tree.insert(path.clone(), conflict_text(o, t, their_label));
            continue;
        };

        if let Some(content) = resolved {
            tree.insert(path.clone(), content.clone());
        }
    }

    TreeMerge { tree, conflicts }
}

/// Build the marker block written into a conflicted file.
fn conflict_text(ours: Option<&String>, theirs: Option<&String>, their_label: &str) -> String {
    let mut text = String::from("<<<<<<< HEAD\n");
    push_side(&mut text, ours);
    text.push_str("=======\n");
    push_side(&mut text, theirs);
    text.push_str(&format!(">>>>>>> {their_label}\n"));
    text
}

fn push_side(text: &mut String, side: Option<&String>) {
    if let Some(content) = side {
        text.push_str(content);
        if !content.is_empty() && !content.ends_with('\n') {
            text.push('\n');
        }
    }
}
