//! engine::gate
//!
//! Whitelist gating for command execution.
//!
//! Each scenario step declares the commands a learner may run. Gating
//! happens before argument validation and before any transition: a command
//! the step does not allow is rejected with `ErrorKind::CommandNotAllowed`
//! and never reaches the repository.
//!
//! # Matching
//!
//! A whitelist entry is a sequence of words. It admits a command when its
//! words are a prefix of the command's words, so `git checkout` admits
//! `git checkout -b feature` and `echo` admits `echo hi > a.txt`.
//!
//! # Invariants
//!
//! - Gating is pure and deterministic
//! - A session without an active step has no whitelist and admits everything

use super::command::{CommandError, Token};

/// Command prefixes allowed in one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Whitelist {
    entries: Vec<Vec<String>>,
}

impl Whitelist {
    /// Build a whitelist from entries such as `"git add"` or `"ls"`.
    pub fn new<S: AsRef<str>>(entries: &[S]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|e| e.as_ref().split_whitespace().map(str::to_string).collect())
                .filter(|words: &Vec<String>| !words.is_empty())
                .collect(),
        }
    }

    /// Whether any entry is a word-prefix of `tokens`.
    pub fn permits(&self, tokens: &[Token]) -> bool {
        self.entries.iter().any(|entry| {
            entry.len() <= tokens.len()
                && entry
                    .iter()
                    .zip(tokens)
                    .all(|(word, token)| word == token.as_str())
        })
    }

    /// Entries as written.
    pub fn entries(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.join(" ")).collect()
    }
}

/// Admit or reject a tokenized command.
///
/// # Example
///
/// ```
/// use gitcoach::engine::command::tokenize;
/// use gitcoach::engine::gate::{gate, Whitelist};
///
/// let whitelist = Whitelist::new(&["git init", "ls"]);
/// assert!(gate(Some(&whitelist), &tokenize("ls -la").unwrap()).is_ok());
/// assert!(gate(Some(&whitelist), &tokenize("git commit -m x").unwrap()).is_err());
/// assert!(gate(None, &tokenize("git commit -m x").unwrap()).is_ok());
/// ```
pub fn gate(whitelist: Option<&Whitelist>, tokens: &[Token]) -> Result<(), CommandError> {
    match whitelist {
        Some(list) if !list.permits(tokens) => Err(CommandError::NotAllowed {
            command: tokens
                .iter()
                .map(Token::as_str)
                .collect::<Vec<_>>()
                .join(" "),
            allowed: list.entries(),
        }),
        _ => Ok(()),
    }
}
