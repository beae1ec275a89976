//! voxgate-lib — Speech gateway engine.
//!
//! Speech synthesis client, audio post-processing, artifact store, retention
//! sweeper, and HTTP API. Depends on voxgate-core for pure types and
//! validation.

pub mod error;
pub mod gateway;
pub mod server;
pub mod store;
pub mod sweeper;
pub mod transcode;
pub mod tts;

// Re-export voxgate-core for convenience
pub use voxgate_core;
