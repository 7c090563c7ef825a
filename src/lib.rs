//! gitcoach - Learn Git by doing, in a simulated repository
//!
//! gitcoach models a small Git repository in memory, lets a learner type
//! Git-like commands against it, and checks the result against the goals of
//! a scenario step.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`core`] - Domain types, the simulated repository, configuration
//! - [`engine`] - Command interpreter, scenarios, event bus, sessions
//! - [`ui`] - Output formatting and graph rendering
//! - [`cli`] - Command-line interface (parses args, drives sessions)
//!
//! # Correctness Invariants
//!
//! 1. The commit graph is acyclic and every parent exists
//! 2. Every repository transition is all-or-nothing
//! 3. Commands a step does not allow never reach the repository
//! 4. A failing event subscriber never affects the engine

pub mod cli;
pub mod core;
pub mod engine;
pub mod ui;
