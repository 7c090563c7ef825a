//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads what it needs (scenario catalogue, session context)
//! 2. Feeds learner input to the engine
//! 3. Formats and displays output
//!
//! Handlers do NOT touch repository state directly.

mod completion;
mod list;
mod play;

// Re-export command functions for testing and direct invocation
pub use completion::completion;
pub use list::{list, show};
pub use play::{play, practice};

use crate::cli::args::Command;
use crate::engine::Context;
use anyhow::Result;

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::List => list::list(ctx),
        Command::Show { scenario } => list::show(ctx, &scenario),
        Command::Play { scenario, script } => play::play(ctx, &scenario, script.as_deref()),
        Command::Practice { script } => play::practice(ctx, script.as_deref()),
        Command::Completion { shell } => completion::completion(shell),
    }
}
