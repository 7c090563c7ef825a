//! ui::graph
//!
//! Text rendering of the commit graph.
//!
//! Commits are drawn newest first, one per row, in lanes:
//!
//! ```text
//! *   3f2a91c (HEAD -> main) Merge branch 'feature'
//! * | 9b1e004 Change app on main
//! | * 51ac7d2 (feature) Change app on feature
//! * / a0c3e88 Add app
//! ```
//!
//! `*` marks the commit of the row, `|` a lane waiting for an older commit,
//! and `/` a lane that joins the row's commit.

use crate::core::repo::snapshot::RepoSnapshot;
use crate::core::types::EntityId;

/// Render every commit in `snapshot`.
pub fn render(snapshot: &RepoSnapshot) -> Vec<String> {
    if snapshot.commits.is_empty() {
        return vec!["(no commits yet)".to_string()];
    }

    let decorations = snapshot.decorations();
    let mut lanes: Vec<Option<EntityId>> = Vec::new();
    let mut rows = Vec::with_capacity(snapshot.commits.len());

    // Creation order is a topological order, so its reverse puts children
    // before parents.
    for commit in snapshot.commits.iter().rev() {
        let col = match lanes.iter().position(|l| l.as_ref() == Some(&commit.id)) {
            Some(col) => col,
            None => free_lane(&mut lanes),
        };

        let mut cells = Vec::with_capacity(lanes.len());
        for (i, lane) in lanes.iter().enumerate() {
            let cell = if i == col {
                '*'
            } else if lane.as_ref() == Some(&commit.id) {
                '/'
            } else if lane.is_some() {
                '|'
            } else {
                ' '
            };
            cells.push(cell.to_string());
        }
        for lane in lanes.iter_mut() {
            if lane.as_ref() == Some(&commit.id) {
                *lane = None;
            }
        }

        let mut parents = commit.parents.iter();
        lanes[col] = parents.next().cloned();
        for parent in parents {
            if !lanes.iter().any(|l| l.as_ref() == Some(parent)) {
                let slot = free_lane(&mut lanes);
                lanes[slot] = Some(parent.clone());
            }
        }

        // Leave room for lanes opened by a merge.
        let width = lanes.len().max(cells.len());
        while cells.len() < width {
            cells.push(" ".to_string());
        }

        let refs = decorations
            .get(&commit.id)
            .map(|labels| format!(" ({})", labels.join(", ")))
            .unwrap_or_default();
        rows.push(format!(
            "{} {}{refs} {}",
            cells.join(" "),
            commit.short_hash(),
            commit.summary()
        ));

        while lanes.last().is_some_and(Option::is_none) {
            lanes.pop();
        }
    }

    rows
}

fn free_lane(lanes: &mut Vec<Option<EntityId>>) -> usize {
    match lanes.iter().position(Option::is_none) {
        Some(i) => i,
        None => {
            lanes.push(None);
            lanes.len() - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::SessionContext;
    use crate::core::repo::Repository;
    use crate::core::types::{BranchName, FilePath};

    fn commit_file(repo: &mut Repository, path: &str, content: &str, message: &str) {
        let path = FilePath::new(path).unwrap();
        repo.write_file(&path, content).unwrap();
        repo.stage_file(&path).unwrap();
        repo.commit(message).unwrap();
    }

    fn lanes_of(row: &str) -> String {
        row.split(|c: char| c.is_ascii_hexdigit())
            .next()
            .unwrap()
            .trim_end()
            .to_string()
    }

    #[test]
    fn empty_repository() {
        let repo = Repository::new(&SessionContext::default());
        assert_eq!(render(&repo.snapshot()), vec!["(no commits yet)"]);
    }

    #[test]
    fn linear_history() {
        let mut repo = Repository::new(&SessionContext::default());
        repo.init_repo().unwrap();
        commit_file(&mut repo, "a.txt", "1\n", "first");
        commit_file(&mut repo, "a.txt", "2\n", "second");

        let rows = render(&repo.snapshot());
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("* "));
        assert!(rows[0].ends_with("(HEAD -> main) second"));
        assert!(rows[1].ends_with(" first"));
    }

    #[test]
    fn merge_opens_and_joins_lanes() {
        let mut repo = Repository::new(&SessionContext::default());
        repo.init_repo().unwrap();
        commit_file(&mut repo, "a.txt", "base\n", "base");
        let feature = BranchName::new("feature").unwrap();
        repo.create_and_switch(&feature, None).unwrap();
        commit_file(&mut repo, "b.txt", "feature\n", "on feature");
        repo.switch_branch(&BranchName::main()).unwrap();
        commit_file(&mut repo, "c.txt", "main\n", "on main");
        repo.merge_branch(&feature).unwrap();

        let rows = render(&repo.snapshot());
        let lanes: Vec<String> = rows.iter().map(|r| lanes_of(r)).collect();
        assert_eq!(lanes, vec!["*", "* |", "| *", "* /"]);
        assert!(rows[2].contains("(feature) on feature"));
    }
}
