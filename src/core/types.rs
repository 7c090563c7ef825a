//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated branch name
//! - [`TagName`] - Validated tag name
//! - [`FilePath`] - Validated working-tree path
//! - [`EntityId`] - Generated identifier for commits, branches and tags
//! - [`ContentHash`] - Simulated commit hash
//! - [`UtcTimestamp`] - RFC3339 timestamp
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, so the repository model never has to re-check
//! a name or a path once it holds one.
//!
//! # Examples
//!
//! ```
//! use gitcoach::core::types::{BranchName, FilePath, TagName};
//!
//! let branch = BranchName::new("feature/login").unwrap();
//! let tag = TagName::new("v1.0").unwrap();
//! let path = FilePath::new("./src/app.js").unwrap();
//! assert_eq!(path.as_str(), "src/app.js");
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(FilePath::new("../outside").is_err());
//! # let _ = (branch, tag);
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// Errors from type validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid tag name: {0}")]
    InvalidTagName(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Check a reference name against Git's refname rules.
///
/// Shared by branch and tag names; the returned message is wrapped into
/// the matching [`TypeError`] variant by the caller.
fn check_refname(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name cannot be empty".into());
    }
    if name == "@" {
        return Err("name cannot be '@' (reserved)".into());
    }
    if name.starts_with('-') {
        return Err("name cannot start with '-'".into());
    }
    if name.ends_with('/') {
        return Err("name cannot end with '/'".into());
    }
    if name.ends_with('.') {
        return Err("name cannot end with '.'".into());
    }

    for needle in ["..", "@{", "//"] {
        if name.contains(needle) {
            return Err(format!("name cannot contain '{needle}'"));
        }
    }

    const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
    if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
        return Err(format!("name cannot contain '{c}'"));
    }
    if name.chars().any(|c| c.is_ascii_control()) {
        return Err("name cannot contain control characters".into());
    }

    for component in name.split('/') {
        if component.starts_with('.') {
            return Err("path component cannot start with '.'".into());
        }
        if component.ends_with(".lock") {
            return Err("path component cannot end with '.lock'".into());
        }
    }

    Ok(())
}

/// A validated branch name.
///
/// Branch names follow Git's refname rules (see `git check-ref-format`).
///
/// # Example
///
/// ```
/// use gitcoach::core::types::BranchName;
///
/// let name = BranchName::new("feature/my-branch").unwrap();
/// assert_eq!(name.as_str(), "feature/my-branch");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new(".hidden").is_err());
/// assert!(BranchName::new("branch.lock").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        check_refname(&name).map_err(TypeError::InvalidBranchName)?;
        Ok(Self(name))
    }

    /// The conventional default branch, `main`.
    pub fn main() -> Self {
        Self("main".to_string())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated tag name.
///
/// Tags share the refname rules of branches but live in their own namespace,
/// so a tag and a branch may carry the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagName(String);

impl TagName {
    /// Create a new validated tag name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidTagName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        check_refname(&name).map_err(TypeError::InvalidTagName)?;
        Ok(Self(name))
    }

    /// Get the tag name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TagName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<TagName> for String {
    fn from(name: TagName) -> Self {
        name.0
    }
}

impl std::fmt::Display for TagName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated, normalized path inside the simulated working tree.
///
/// Paths are relative, use `/` as the separator and never escape the
/// repository root. A leading `./` is stripped.
///
/// # Example
///
/// ```
/// use gitcoach::core::types::FilePath;
///
/// assert_eq!(FilePath::new("./docs/guide.md").unwrap().as_str(), "docs/guide.md");
/// assert!(FilePath::new("/etc/passwd").is_err());
/// assert!(FilePath::new("*").is_err());
/// assert!(FilePath::new(".git/config").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilePath(String);

impl FilePath {
    /// Create a new validated path.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidPath` for empty, absolute, escaping or
    /// wildcard paths, and for anything under `.git`.
    pub fn new(path: impl Into<String>) -> Result<Self, TypeError> {
        let raw = path.into();
        let mut path = raw.as_str();
        while let Some(rest) = path.strip_prefix("./") {
            path = rest;
        }

        if path.is_empty() {
            return Err(TypeError::InvalidPath("path cannot be empty".into()));
        }
        if path.starts_with('/') {
            return Err(TypeError::InvalidPath(format!(
                "'{raw}' is outside the repository"
            )));
        }
        if path.ends_with('/') {
            return Err(TypeError::InvalidPath(format!("'{raw}' is a directory")));
        }
        if path.contains('*') || path.contains('?') {
            return Err(TypeError::InvalidPath(format!(
                "'{raw}' contains a wildcard"
            )));
        }
        if path.chars().any(|c| c.is_control()) {
            return Err(TypeError::InvalidPath(
                "path cannot contain control characters".into(),
            ));
        }

        for component in path.split('/') {
            match component {
                "" | "." => {
                    return Err(TypeError::InvalidPath(format!(
                        "'{raw}' has an empty component"
                    )))
                }
                ".." => {
                    return Err(TypeError::InvalidPath(format!(
                        "'{raw}' is outside the repository"
                    )))
                }
                ".git" => {
                    return Err(TypeError::InvalidPath(
                        "'.git' is reserved for the repository itself".into(),
                    ))
                }
                _ => {}
            }
        }

        Ok(Self(path.to_string()))
    }

    /// Get the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FilePath {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<FilePath> for String {
    fn from(path: FilePath) -> Self {
        path.0
    }
}

impl std::fmt::Display for FilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier of a commit, branch or tag.
///
/// Generated ids combine a millisecond timestamp with a random suffix taken
/// from a v4 UUID, prefixed by the entity kind:
/// `commit-18b2f3a01c4-9f3ab21c`. Ids are never reused within a process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Generate a fresh id with the given kind prefix.
    pub fn generate(prefix: &str) -> Self {
        let millis = chrono::Utc::now().timestamp_millis().max(0);
        let random = Uuid::new_v4().simple().to_string();
        Self(format!("{prefix}-{millis:x}-{}", &random[..8]))
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Simulated content hash of a commit.
///
/// Computed with SHA-256 over the parts handed to [`ContentHash::compute`].
/// It looks like a Git object name but is not compatible with Git.
///
/// # Example
///
/// ```
/// use gitcoach::core::types::ContentHash;
///
/// let a = ContentHash::compute(&["msg", "parent"]);
/// let b = ContentHash::compute(&["msg", "parent"]);
/// assert_eq!(a, b);
/// assert_eq!(a.short(7).len(), 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash the given parts, separated by NUL bytes.
    pub fn compute(parts: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update(b"\0");
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Get an abbreviated form of the hash.
    ///
    /// Returns the first `len` characters, or the whole hash if shorter.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    /// Get the hash as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A UTC timestamp in RFC3339 format.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Create a timestamp from a chrono DateTime.
    pub fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self(dt)
    }

    /// Get the underlying datetime.
    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod branch_name {
        use super::*;

        #[test]
        fn valid_branch_names() {
            assert!(BranchName::new("main").is_ok());
            assert!(BranchName::new("feature/login").is_ok());
            assert!(BranchName::new("fix-123").is_ok());
            assert!(BranchName::new("user@feature").is_ok());
            assert!(BranchName::new("with.dot").is_ok());
        }

        #[test]
        fn structural_rules() {
            assert!(BranchName::new("").is_err());
            assert!(BranchName::new("@").is_err());
            assert!(BranchName::new("-flag").is_err());
            assert!(BranchName::new("branch/").is_err());
            assert!(BranchName::new("bad..path").is_err());
            assert!(BranchName::new("foo@{bar").is_err());
            assert!(BranchName::new("foo//bar").is_err());
            assert!(BranchName::new("foo/.hidden").is_err());
            assert!(BranchName::new("foo/bar.lock").is_err());
        }

        #[test]
        fn special_chars_rejected() {
            for name in ["has space", "a~b", "a^b", "a:b", "a\\b", "a?b", "a*b", "a[b"] {
                assert!(BranchName::new(name).is_err(), "{name} accepted");
            }
            assert!(BranchName::new("has\ttab").is_err());
        }

        #[test]
        fn error_names_the_kind() {
            let err = BranchName::new("a b").unwrap_err();
            assert!(matches!(err, TypeError::InvalidBranchName(_)));
            let err = TagName::new("a b").unwrap_err();
            assert!(matches!(err, TypeError::InvalidTagName(_)));
        }

        #[test]
        fn serde_rejects_invalid() {
            let parsed: Result<BranchName, _> = serde_json::from_str("\"bad..name\"");
            assert!(parsed.is_err());
        }
    }

    mod file_path {
        use super::*;

        #[test]
        fn normalizes_leading_dot_slash() {
            assert_eq!(FilePath::new("./a.txt").unwrap().as_str(), "a.txt");
            assert_eq!(FilePath::new("././a/b.txt").unwrap().as_str(), "a/b.txt");
        }

        #[test]
        fn rejects_escapes_and_wildcards() {
            assert!(FilePath::new("").is_err());
            assert!(FilePath::new("./").is_err());
            assert!(FilePath::new("/abs").is_err());
            assert!(FilePath::new("a/../b").is_err());
            assert!(FilePath::new("a//b").is_err());
            assert!(FilePath::new("dir/").is_err());
            assert!(FilePath::new("*.txt").is_err());
            assert!(FilePath::new(".git").is_err());
        }

        #[test]
        fn dotfiles_allowed() {
            assert!(FilePath::new(".gitignore").is_ok());
        }

        #[test]
        fn ordering_is_lexicographic() {
            let a = FilePath::new("a.txt").unwrap();
            let b = FilePath::new("b.txt").unwrap();
            assert!(a < b);
        }
    }

    mod entity_id {
        use super::*;

        #[test]
        fn carries_prefix() {
            let id = EntityId::generate("commit");
            assert!(id.as_str().starts_with("commit-"));
        }

        #[test]
        fn never_repeats() {
            let ids: std::collections::HashSet<_> =
                (0..1000).map(|_| EntityId::generate("tag")).collect();
            assert_eq!(ids.len(), 1000);
        }
    }

    mod content_hash {
        use super::*;

        #[test]
        fn separator_prevents_ambiguity() {
            let a = ContentHash::compute(&["ab", "c"]);
            let b = ContentHash::compute(&["a", "bc"]);
            assert_ne!(a, b);
        }

        #[test]
        fn short_form() {
            let h = ContentHash::compute(&["x"]);
            assert_eq!(h.as_str().len(), 64);
            assert_eq!(h.short(100), h.as_str());
            assert_eq!(h.short(4), &h.as_str()[..4]);
        }
    }

    #[test]
    fn timestamp_display_is_rfc3339() {
        let ts = UtcTimestamp::now();
        assert!(ts.to_string().contains('T'));
    }
}
