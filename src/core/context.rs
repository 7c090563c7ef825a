//! core::context
//!
//! Explicit per-session context.
//!
//! A session (one learner working through one scenario, or free practice)
//! owns a [`SessionContext`] and hands it to the repository and the scenario
//! runner when it builds them. Nothing in the crate reads session settings
//! from global state.

use uuid::Uuid;

use super::config::Config;
use super::repo::snapshot::RemoteSnapshot;
use super::types::{BranchName, UtcTimestamp};

/// Settings and identity of one tutoring session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Unique id of this session, used in diagnostics.
    pub id: Uuid,
    /// When the session started.
    pub started_at: UtcTimestamp,
    /// Branch created by `git init`.
    pub default_branch: BranchName,
    /// Remote served to `git clone` when the active step defines none.
    pub remote: RemoteSnapshot,
}

impl SessionContext {
    /// Create a context with the given default branch.
    pub fn new(default_branch: BranchName) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: UtcTimestamp::now(),
            default_branch,
            remote: RemoteSnapshot::default(),
        }
    }

    /// Create a context from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        let mut ctx = Self::new(config.default_branch());
        ctx.remote.default_branch = ctx.default_branch.clone();
        ctx
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(BranchName::main())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contexts_get_distinct_ids() {
        let a = SessionContext::default();
        let b = SessionContext::default();
        assert_ne!(a.id, b.id);
        assert_eq!(a.default_branch.as_str(), "main");
    }

    #[test]
    fn from_config_uses_configured_branch() {
        let mut config = Config::default();
        config.global.default_branch = Some("trunk".to_string());
        let ctx = SessionContext::from_config(&config);
        assert_eq!(ctx.default_branch.as_str(), "trunk");
        assert_eq!(ctx.remote.default_branch.as_str(), "trunk");
    }
}
