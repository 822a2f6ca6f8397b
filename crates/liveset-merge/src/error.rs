//! Error types for the merge engine.

use liveset_tree::NodeId;

/// Errors that abort a merge.
///
/// None of these are transient: each one means the input is malformed or
/// an invariant was violated, so nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// A track lacks a readable `Id`, group membership, or name node.
    #[error("malformed track {node}: {reason}")]
    MalformedTrack { node: NodeId, reason: String },

    /// Two independently keyed group containers ended up under one key.
    #[error("group {key} is claimed by two distinct group containers")]
    GroupCollision { key: i64 },

    /// Renumbering found nothing above the reserved threshold.
    #[error("no pointee with an Id above {threshold}; the document is unexpected or corrupt")]
    NoPointeesFound { threshold: i64 },

    /// The destination track container cannot hold children.
    #[error("track container {0} does not accept children")]
    MissingAppendCapability(NodeId),

    /// The destination has no track container at the configured path.
    #[error("track container not found at {0}")]
    TracksContainerNotFound(String),

    /// The destination has no next-pointee node at the configured path.
    #[error("next pointee node not found at {0}")]
    NextPointeeNotFound(String),

    /// The merge configuration could not be read.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("tree error: {0}")]
    Tree(#[from] liveset_tree::TreeError),

    #[error("extraction error: {0}")]
    Extract(#[from] liveset_extract::ExtractError),
}

impl MergeError {
    /// Create a malformed-track error.
    pub fn malformed(node: NodeId, reason: impl Into<String>) -> Self {
        Self::MalformedTrack {
            node,
            reason: reason.into(),
        }
    }
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
