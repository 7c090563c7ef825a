//! cli
//!
//! Command-line interface layer for gitcoach.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and set up logging
//! - Delegate to command handlers
//! - Does NOT interpret learner commands itself
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and hands learner
//! input to an [`crate::engine::Session`]. All repository state changes flow
//! through the engine's executor.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use crate::core::config::Config;
use crate::engine;
use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.quiet, cli.debug);

    let config = Config::load().context("Failed to load configuration")?;
    if let Some(path) = config.loaded_from() {
        tracing::debug!(path = %path.display(), "using config file");
    }

    // CLI flags take precedence over config values.
    let ctx = engine::Context {
        debug: cli.debug,
        quiet: cli.quiet,
        graph: cli.graph,
        scenarios: cli.scenarios.clone(),
        config,
    };

    commands::dispatch(cli.command, &ctx)
}

/// Route engine diagnostics to stderr.
///
/// `--quiet` silences them, `--debug` shows everything down to debug level,
/// otherwise `RUST_LOG` applies with `warn` as the fallback.
fn init_tracing(quiet: bool, debug: bool) {
    let filter = if quiet {
        EnvFilter::new("off")
    } else if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
