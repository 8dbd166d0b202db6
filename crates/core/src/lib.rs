//! mergeview core library.
//!
//! This crate turns three-way merge output containing conflict markers into
//! displayable sections and reconstructs file content from a per-conflict
//! choice of side. It also provides the merge engines that produce that
//! output, configuration, and error types.

pub mod config;
pub mod conflict;
pub mod errors;
pub mod merge;

// Re-exports for convenience.
pub use config::EngineConfig;
pub use conflict::{ConflictFile, FileCollection};
pub use errors::CoreError;
