//! Error types for the extraction crate.

/// Errors that can occur while splitting or summarizing a document.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// A document-level info pattern matched nothing usable.
    #[error("info '{name}' matched no element for pattern {pattern}")]
    InvalidInfoNode { name: String, pattern: String },

    /// Tree access failed.
    #[error("tree error: {0}")]
    Tree(#[from] liveset_tree::TreeError),
}

/// Convenience alias for extraction results.
pub type ExtractResult<T> = Result<T, ExtractError>;
