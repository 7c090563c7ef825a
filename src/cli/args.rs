//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--scenarios <file>`: Load extra scenarios
//! - `--graph`: Draw the commit graph after each change

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// gitcoach - Learn Git by doing, in a simulated repository
#[derive(Parser, Debug)]
#[command(name = "gitcoach")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Extra scenario file (TOML) added to the built-in catalogue
    #[arg(long, global = true, value_name = "FILE")]
    pub scenarios: Option<PathBuf>,

    /// Draw the commit graph after every change
    #[arg(long, global = true)]
    pub graph: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List available scenarios
    List,

    /// Show the steps of a scenario
    Show {
        /// Scenario id (see `gitcoach list`)
        scenario: String,
    },

    /// Work through a scenario step by step
    #[command(after_help = "\
Inside the session, type Git commands as you would in a terminal.
Lines starting with ':' are session commands:
    :hint     show a hint for the current step
    :graph    draw the commit graph
    :status   show the current step
    :reset    restart the current step
    :quit     leave the session")]
    Play {
        /// Scenario id (see `gitcoach list`)
        scenario: String,

        /// Read commands from a file instead of the terminal
        #[arg(long, value_name = "FILE")]
        script: Option<PathBuf>,
    },

    /// Experiment freely in an empty repository
    Practice {
        /// Read commands from a file instead of the terminal
        #[arg(long, value_name = "FILE")]
        script: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    #[command(after_help = "\
Examples:
    # Bash
    gitcoach completion bash > ~/.local/share/bash-completion/completions/gitcoach

    # Zsh
    gitcoach completion zsh > ~/.zfunc/_gitcoach

    # Fish
    gitcoach completion fish > ~/.config/fish/completions/gitcoach.fish

    # PowerShell
    gitcoach completion powershell >> $PROFILE")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Shells supported by `completion`.
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}
