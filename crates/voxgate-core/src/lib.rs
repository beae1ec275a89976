//! voxgate-core — Pure types, identifiers and text validation.
//!
//! No async runtime, no I/O, no platform dependencies.

pub mod id;
pub mod text;
pub mod types;
