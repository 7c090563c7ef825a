//! engine::predicate
//!
//! Expected-state predicates for scenario steps.
//!
//! A predicate is data: a map from attribute key to expected value. It is
//! evaluated against a *state view*, a JSON object derived from a
//! [`RepoSnapshot`] with one entry per known attribute.
//!
//! # Expected values
//!
//! | expected | matches when |
//! |---|---|
//! | bool, number | the attribute equals it |
//! | string | it is a pattern matching the attribute, or any element of a list attribute |
//! | list of strings | every pattern matches some element (`[]` requires an empty list) |
//!
//! Patterns are literal text where `*` stands for any run of characters.
//! A lone `*` means "any non-empty value".
//!
//! # Keys
//!
//! Nested attributes use `.`; at each level the longest key that exists
//! wins, so `files.README.md` finds the `README.md` entry of `files`.
//! A key whose attribute is missing never matches.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::core::repo::snapshot::{HeadView, RepoSnapshot};
use crate::core::repo::status::FileStatus;

/// Attribute keys a predicate may name.
pub const KNOWN_KEYS: &[&str] = &[
    "hasGitInit",
    "hasCommit",
    "commitCount",
    "currentBranch",
    "branches",
    "tags",
    "stagedFiles",
    "modifiedFiles",
    "untrackedFiles",
    "deletedFiles",
    "files",
    "mergedBranch",
    "hasCloned",
    "hasConflictingChanges",
    "conflictsResolved",
    "detachedHead",
    "workingTreeClean",
];

/// Whether `key` names a known attribute (or a nested entry of one).
pub fn is_known_key(key: &str) -> bool {
    let root = key.split_once('.').map_or(key, |(root, _)| root);
    KNOWN_KEYS.contains(&root)
}

/// One expected value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expected {
    Bool(bool),
    Number(i64),
    Pattern(String),
    Patterns(Vec<String>),
}

/// A step's expected state: attribute key → expected value.
pub type ExpectedState = BTreeMap<String, Expected>;

/// Result of evaluating a predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub met: Vec<String>,
    pub unmet: Vec<String>,
}

impl Evaluation {
    /// Every key matched.
    pub fn is_satisfied(&self) -> bool {
        self.unmet.is_empty()
    }
}

/// Evaluate `expected` against a state view.
pub fn evaluate(expected: &ExpectedState, view: &Value) -> Evaluation {
    let mut result = Evaluation::default();
    for (key, value) in expected {
        if matches(value, lookup(view, key)) {
            result.met.push(key.clone());
        } else {
            result.unmet.push(key.clone());
        }
    }
    result
}

/// Build the state view of a snapshot.
///
/// # Example
///
/// ```
/// use gitcoach::core::context::SessionContext;
/// use gitcoach::core::repo::Repository;
/// use gitcoach::engine::predicate::state_view;
///
/// let mut repo = Repository::new(&SessionContext::default());
/// repo.init_repo().unwrap();
///
/// let view = state_view(&repo.snapshot());
/// assert_eq!(view["hasGitInit"], true);
/// assert_eq!(view["currentBranch"], "main");
/// assert_eq!(view["commitCount"], 0);
/// ```
pub fn state_view(snapshot: &RepoSnapshot) -> Value {
    let names = |status: FileStatus| -> Vec<String> {
        snapshot
            .files_with_status(status)
            .into_iter()
            .map(|p| p.to_string())
            .collect()
    };

    let files: Map<String, Value> = snapshot
        .working_tree
        .iter()
        .filter_map(|(path, file)| {
            file.content
                .as_ref()
                .map(|content| (path.to_string(), Value::String(content.clone())))
        })
        .collect();

    let clean = snapshot.staged.is_empty()
        && snapshot
            .working_tree
            .values()
            .all(|f| f.status == FileStatus::Unmodified);

    let mut view = json!({
        "hasGitInit": snapshot.initialized,
        "hasCommit": !snapshot.commits.is_empty(),
        "commitCount": snapshot.commits.len(),
        "branches": snapshot.branches.keys().map(|b| b.to_string()).collect::<Vec<_>>(),
        "tags": snapshot.tags.keys().map(|t| t.to_string()).collect::<Vec<_>>(),
        "stagedFiles": snapshot.staged.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
        "modifiedFiles": names(FileStatus::Modified),
        "untrackedFiles": names(FileStatus::Untracked),
        "deletedFiles": names(FileStatus::Deleted),
        "files": files,
        "mergedBranch": snapshot.merged_branches.iter().map(|b| b.to_string()).collect::<Vec<_>>(),
        "hasCloned": snapshot.origin.is_some(),
        "hasConflictingChanges": !snapshot.conflicts.is_empty(),
        "conflictsResolved": snapshot.conflict_seen
            && snapshot.conflicts.is_empty()
            && snapshot.merging.is_none(),
        "detachedHead": matches!(snapshot.head, HeadView::Detached { .. }),
        "workingTreeClean": clean,
    });

    if snapshot.initialized {
        if let (Some(branch), Some(map)) = (snapshot.head.branch(), view.as_object_mut()) {
            map.insert("currentBranch".to_string(), json!(branch.as_str()));
        }
    }

    view
}

/// Find a possibly dotted key in a view.
pub fn lookup<'a>(view: &'a Value, key: &str) -> Option<&'a Value> {
    let object = view.as_object()?;
    if let Some(value) = object.get(key) {
        return Some(value);
    }
    for (dot, _) in key.rmatch_indices('.') {
        let (head, rest) = (&key[..dot], &key[dot + 1..]);
        if let Some(found) = object.get(head).and_then(|child| lookup(child, rest)) {
            return Some(found);
        }
    }
    None
}

fn matches(expected: &Expected, actual: Option<&Value>) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    match expected {
        Expected::Bool(b) => actual.as_bool() == Some(*b),
        Expected::Number(n) => actual.as_i64() == Some(*n),
        Expected::Pattern(pattern) => match actual {
            Value::Array(items) => items.iter().any(|item| scalar_matches(pattern, item)),
            other => scalar_matches(pattern, other),
        },
        Expected::Patterns(patterns) => match actual.as_array() {
            Some(items) if patterns.is_empty() => items.is_empty(),
            Some(items) => patterns
                .iter()
                .all(|p| items.iter().any(|item| scalar_matches(p, item))),
            None => false,
        },
    }
}

fn scalar_matches(pattern: &str, value: &Value) -> bool {
    match value {
        Value::String(s) => glob_match(pattern, s),
        Value::Number(n) => glob_match(pattern, &n.to_string()),
        Value::Bool(b) => glob_match(pattern, if *b { "true" } else { "false" }),
        _ => false,
    }
}

/// Match `value` against a pattern where `*` is any run of characters.
///
/// A pattern that is exactly `*` requires a non-empty value.
///
/// ```
/// use gitcoach::engine::predicate::glob_match;
///
/// assert!(glob_match("feature/*", "feature/login"));
/// assert!(glob_match("*.md", "README.md"));
/// assert!(!glob_match("*", ""));
/// assert!(glob_match("main", "main"));
/// ```
pub fn glob_match(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return !value.is_empty();
    }

    let p: Vec<char> = pattern.chars().collect();
    let v: Vec<char> = value.chars().collect();
    let (mut pi, mut vi) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while vi < v.len() {
        if pi < p.len() && p[pi] == '*' {
            star = Some((pi, vi));
            pi += 1;
        } else if pi < p.len() && p[pi] == v[vi] {
            pi += 1;
            vi += 1;
        } else if let Some((sp, sv)) = star {
            pi = sp + 1;
            vi = sv + 1;
            star = Some((sp, sv + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::SessionContext;
    use crate::core::repo::Repository;
    use crate::core::types::{BranchName, FilePath};

    fn expected(entries: &[(&str, Expected)]) -> ExpectedState {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn text(s: &str) -> Expected {
        Expected::Pattern(s.to_string())
    }

    fn list(items: &[&str]) -> Expected {
        Expected::Patterns(items.iter().map(|s| s.to_string()).collect())
    }

    mod globbing {
        use super::*;

        #[test]
        fn wildcard_positions() {
            assert!(glob_match("feature/*", "feature/"));
            assert!(glob_match("*-fix", "bug-fix"));
            assert!(glob_match("a*b*c", "aXXbYYc"));
            assert!(!glob_match("a*b*c", "aXXbYY"));
            assert!(glob_match("**", ""));
        }

        #[test]
        fn literal_requires_exact_match() {
            assert!(!glob_match("main", "main2"));
            assert!(!glob_match("main", "mai"));
            assert!(glob_match("", ""));
        }
    }

    mod lookup_keys {
        use super::*;

        #[test]
        fn dotted_keys_find_files() {
            let view = json!({"files": {"README.md": "hi", "docs": "x"}});
            assert_eq!(lookup(&view, "files.README.md"), Some(&json!("hi")));
            assert_eq!(lookup(&view, "files.docs"), Some(&json!("x")));
            assert_eq!(lookup(&view, "files.missing"), None);
        }

        #[test]
        fn longest_key_wins() {
            let view = json!({"a.b": {"c": 1}, "a": {"b": {"c": 2}}});
            assert_eq!(lookup(&view, "a.b.c"), Some(&json!(1)));
        }
    }

    mod evaluation {
        use super::*;

        fn view() -> Value {
            json!({
                "hasGitInit": true,
                "commitCount": 2,
                "currentBranch": "feature/login",
                "branches": ["feature/login", "main"],
                "stagedFiles": [],
                "mergedBranch": ["feature/login"],
            })
        }

        #[test]
        fn scalars_and_patterns() {
            let state = expected(&[
                ("hasGitInit", Expected::Bool(true)),
                ("commitCount", Expected::Number(2)),
                ("currentBranch", text("feature/*")),
                ("mergedBranch", text("feature/*")),
            ]);
            assert!(evaluate(&state, &view()).is_satisfied());
        }

        #[test]
        fn unmet_keys_reported() {
            let state = expected(&[
                ("hasGitInit", Expected::Bool(false)),
                ("commitCount", Expected::Number(2)),
            ]);
            let result = evaluate(&state, &view());
            assert_eq!(result.unmet, vec!["hasGitInit"]);
            assert_eq!(result.met, vec!["commitCount"]);
        }

        #[test]
        fn lists_need_every_pattern() {
            let view = view();
            assert!(evaluate(&expected(&[("branches", list(&["main", "feature/*"]))]), &view)
                .is_satisfied());
            assert!(!evaluate(&expected(&[("branches", list(&["main", "dev"]))]), &view)
                .is_satisfied());
            assert!(evaluate(&expected(&[("stagedFiles", list(&[]))]), &view).is_satisfied());
            assert!(!evaluate(&expected(&[("stagedFiles", list(&["*"]))]), &view).is_satisfied());
        }

        #[test]
        fn missing_attribute_never_matches() {
            let state = expected(&[("detachedHead", Expected::Bool(false))]);
            assert!(!evaluate(&state, &view()).is_satisfied());
        }

        #[test]
        fn type_mismatch_fails() {
            let state = expected(&[("hasGitInit", Expected::Number(1))]);
            assert!(!evaluate(&state, &view()).is_satisfied());
        }
    }

    #[test]
    fn expected_values_deserialize_from_toml() {
        let parsed: ExpectedState = toml::from_str(
            r#"
            hasGitInit = true
            commitCount = 3
            currentBranch = "feature/*"
            stagedFiles = ["*"]
            "#,
        )
        .unwrap();
        assert_eq!(parsed["hasGitInit"], Expected::Bool(true));
        assert_eq!(parsed["commitCount"], Expected::Number(3));
        assert_eq!(parsed["currentBranch"], text("feature/*"));
        assert_eq!(parsed["stagedFiles"], list(&["*"]));
    }

    #[test]
    fn known_keys() {
        assert!(is_known_key("hasCommit"));
        assert!(is_known_key("files.src/app.js"));
        assert!(!is_known_key("hasRebased"));
    }

    #[test]
    fn view_tracks_repository_state() {
        let mut repo = Repository::new(&SessionContext::default());
        let before = state_view(&repo.snapshot());
        assert_eq!(before["hasGitInit"], false);
        assert!(lookup(&before, "currentBranch").is_none());

        repo.init_repo().unwrap();
        let readme = FilePath::new("README.md").unwrap();
        repo.write_file(&readme, "# hi\n").unwrap();
        let view = state_view(&repo.snapshot());
        assert_eq!(view["untrackedFiles"], json!(["README.md"]));
        assert_eq!(lookup(&view, "files.README.md"), Some(&json!("# hi\n")));
        assert_eq!(view["workingTreeClean"], false);

        repo.stage_file(&readme).unwrap();
        repo.commit("Add README").unwrap();
        repo.create_branch(&BranchName::new("feature").unwrap(), None)
            .unwrap();
        let view = state_view(&repo.snapshot());
        assert_eq!(view["hasCommit"], true);
        assert_eq!(view["branches"], json!(["feature", "main"]));
        assert_eq!(view["workingTreeClean"], true);
        assert_eq!(view["detachedHead"], false);
        assert_eq!(view["conflictsResolved"], false);
    }
}
