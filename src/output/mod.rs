//! Output module: directory-tree persistence and run checkpointing
//!
//! This module handles:
//! - Mapping crawl nodes onto a deterministic file-system layout
//! - Sanitizing taxonomy names into safe path segments
//! - Persisting the completed-node checkpoint and pending frontier

mod checkpoint;
mod writer;

pub use checkpoint::{Checkpoint, CheckpointStore, FrontierSnapshot};
pub use writer::{sanitize_segment, OutputError, OutputResult, OutputWriter};
