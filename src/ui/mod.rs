//! ui
//!
//! Terminal presentation.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//! - [`graph`] - Text rendering of the commit graph
//!
//! # Design
//!
//! The UI module is the only place that writes to the terminal. The engine
//! hands it snapshots and events; it never reaches back into the engine.

pub mod graph;
pub mod output;
