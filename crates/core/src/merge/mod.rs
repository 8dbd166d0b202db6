//! Merge engines feeding the conflict subsystem.
//!
//! Both implement [`MergeEngine`](crate::conflict::MergeEngine):
//! [`TextMerger`] merges files held in memory, [`GitMergeEngine`] merges two
//! commits of a local repository.

pub mod git;
pub mod text;

pub use git::GitMergeEngine;
pub use text::{TextEntry, TextMerge, TextMerger};
