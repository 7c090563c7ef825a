//! engine
//!
//! Drives a simulated repository from learner input and decides when a
//! scenario step is done.
//!
//! # Architecture
//!
//! ```text
//! line -> command::tokenize -> gate -> command::parse -> exec::execute
//!      -> bus (state-changed) -> predicate::evaluate -> bus (step events)
//! ```
//!
//! [`session::Session`] runs that pipeline for each submitted line. The
//! other modules are its stages:
//!
//! - [`command`]: tokenizer and parser for the supported command grammar
//! - [`gate`]: per-step whitelist of command prefixes
//! - [`exec`]: the single executor mapping commands to repository transitions
//! - [`predicate`]: expected-state matching with `*` wildcards
//! - [`scenario`]: scenario catalogue and step progression
//! - [`bus`]: publish/subscribe with handler isolation
//!
//! # Invariants
//!
//! - Only [`exec::execute`] mutates the repository
//! - A rejected command leaves the repository exactly as it was
//! - Step predicates are evaluated only after a mutation

pub mod bus;
pub mod command;
pub mod exec;
pub mod gate;
pub mod predicate;
pub mod scenario;
pub mod session;

pub use bus::{Event, EventBus, PublishReport, SubscriptionId, Topic};
pub use command::{parse_line, tokenize, CommandError, ParsedCommand, Token};
pub use exec::{execute, CommandOutcome};
pub use gate::Whitelist;
pub use predicate::{Evaluation, Expected, ExpectedState};
pub use scenario::{CatalogError, Scenario, ScenarioCatalog, ScenarioRunner, Step};
pub use session::{Session, StepStatus, Submission};

use std::path::{Path, PathBuf};

use crate::core::config::Config;
use crate::core::context::SessionContext;

/// Execution context for CLI commands.
///
/// Contains global settings derived from CLI flags, plus the loaded
/// configuration they override.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
    /// Draw the commit graph after every mutating command.
    pub graph: bool,
    /// Extra scenario file given on the command line.
    pub scenarios: Option<PathBuf>,
    /// Configuration file values.
    pub config: Config,
}

impl Context {
    /// Whether to draw the graph: the flag, else the config file.
    pub fn show_graph(&self) -> bool {
        self.graph || self.config.show_graph()
    }

    /// Extra scenario file: the flag, else the config file.
    pub fn scenarios_path(&self) -> Option<&Path> {
        self.scenarios
            .as_deref()
            .or_else(|| self.config.scenarios_path())
    }

    /// A fresh session context for one play or practice run.
    pub fn session_context(&self) -> SessionContext {
        SessionContext::from_config(&self.config)
    }
}
