//! Structured error types for heapscope
//!
//! Using thiserror for automatic Display implementation and error chaining.

use super::types::NodeId;
use thiserror::Error;

/// Malformed-input errors detected while building a heap tree.
///
/// Any of these fails the whole build; no partial tree is returned.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("{id} has negative self size {size}")]
    NegativeSelfSize { id: NodeId, size: i64 },

    #[error("Duplicate node identifier {0}")]
    DuplicateNodeId(NodeId),

    #[error("Total size of {0} overflows")]
    SizeOverflow(NodeId),

    #[error("{id} is nested deeper than the limit of {limit}")]
    DepthLimitExceeded { id: NodeId, limit: usize },

    #[error("Sample {ordinal} references unknown {node}")]
    UnknownSampleNode { ordinal: u64, node: NodeId },

    #[error("Tree build cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
