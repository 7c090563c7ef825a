//! Property-based tests for the simulated repository and the interpreter.
//!
//! These tests use proptest to drive sessions with random command sequences
//! and check that repository invariants hold after every step.

use proptest::prelude::*;

use gitcoach::core::context::SessionContext;
use gitcoach::core::types::BranchName;
use gitcoach::core::verify::verify;
use gitcoach::engine::predicate::glob_match;
use gitcoach::engine::session::Session;

/// Commands a learner might type, valid or not in any given state.
fn command_line() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "git init",
        "git status",
        "git log --oneline",
        "git branch",
        "echo one > a.txt",
        "echo two > b.txt",
        "echo more >> a.txt",
        "echo other > a.txt",
        "rm b.txt",
        "git add .",
        "git add a.txt",
        "git reset a.txt",
        "git commit -m work",
        "git commit -am more",
        "git branch feature",
        "git branch -d feature",
        "git branch -D topic",
        "git checkout feature",
        "git checkout main",
        "git checkout -b topic",
        "git switch main",
        "git merge feature",
        "git merge topic",
        "git merge main",
        "git merge --abort",
        "git tag v1",
        "git tag -d v1",
        "git clone https://example.com/repo.git",
        "git checkout HEAD",
        "cat a.txt",
        "ls -a",
    ])
}

/// Strategy for branch-name-like words.
fn branch_word() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,10}(/[a-z0-9-]{1,10})?"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Random sessions never break repository invariants.
    #[test]
    fn random_sessions_keep_invariants(lines in prop::collection::vec(command_line(), 1..40)) {
        let mut session = Session::practice(SessionContext::default());
        for line in lines {
            let before = session.repo().snapshot();
            let result = session.submit(line);

            let report = verify(session.repo());
            prop_assert!(report.ok, "after '{}': {:?}", line, report.errors);

            if result.is_err() {
                prop_assert_eq!(&session.repo().snapshot(), &before, "rejected '{}' changed state", line);
            }
        }
    }

    /// Merge commits always have exactly two parents, and commits never
    /// reference parents created after them.
    #[test]
    fn history_is_well_formed(lines in prop::collection::vec(command_line(), 1..40)) {
        let mut session = Session::practice(SessionContext::default());
        for line in lines {
            let _ = session.submit(line);
        }

        let commits = session.repo().commits();
        for (i, commit) in commits.iter().enumerate() {
            prop_assert!(commit.parents.len() <= 2);
            for parent in &commit.parents {
                let position = commits.iter().position(|c| &c.id == parent);
                prop_assert!(matches!(position, Some(p) if p < i));
            }
        }
    }

    /// A staged commit always has the previous HEAD as its first parent and
    /// empties the staging area.
    #[test]
    fn commit_advances_from_head(content in "[a-z]{1,12}") {
        let mut session = Session::practice(SessionContext::default());
        session.submit("git init").unwrap();
        session.submit("echo base > a.txt").unwrap();
        session.submit("git add .").unwrap();
        session.submit("git commit -m base").unwrap();
        let previous = session.repo().head_commit_id().cloned().unwrap();

        session.submit(&format!("echo {content} > a.txt")).unwrap();
        session.submit("git add a.txt").unwrap();
        session.submit("git commit -m next").unwrap();

        let head = session.repo().head_commit().unwrap();
        prop_assert_eq!(&head.parents, &vec![previous]);
        prop_assert_eq!(session.repo().staged().count(), 0);
    }

    /// Switching to a branch that does not exist leaves HEAD alone.
    #[test]
    fn switch_to_missing_branch_fails(name in branch_word()) {
        prop_assume!(name != "main");
        prop_assume!(BranchName::new(name.as_str()).is_ok());

        let mut session = Session::practice(SessionContext::default());
        session.submit("git init").unwrap();
        session.submit("echo x > x.txt").unwrap();
        session.submit("git add .").unwrap();
        session.submit("git commit -m x").unwrap();
        let head = session.repo().head().clone();

        let result = session.submit(&format!("git switch {name}"));
        prop_assert!(result.is_err());
        prop_assert_eq!(session.repo().head(), &head);
    }

    /// A pattern without wildcards matches only itself.
    #[test]
    fn literal_patterns_match_exactly(a in "[a-z/]{1,12}", b in "[a-z/]{1,12}") {
        prop_assert!(glob_match(&a, &a));
        prop_assert_eq!(glob_match(&a, &b), a == b);
    }

    /// `prefix*` matches every extension of the prefix.
    #[test]
    fn prefix_patterns_match_extensions(prefix in "[a-z]{1,8}/", rest in "[a-z0-9-]{0,12}") {
        let pattern = format!("{prefix}*");
        let value = format!("{prefix}{rest}");
        prop_assert!(glob_match(&pattern, &value));
        prop_assert!(!glob_match(&pattern, "main"));
    }
}
