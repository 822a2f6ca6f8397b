//! Error types for the node tree.

use crate::document::NodeId;

/// Errors that can occur while reading, mutating, or writing a document.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// The XML input could not be parsed.
    #[error("XML parse error at byte {position}: {message}")]
    Parse { position: u64, message: String },

    /// The document could not be written back to XML.
    #[error("XML serialization error: {0}")]
    Serialize(String),

    /// A structural path pattern could not be parsed.
    #[error("invalid path pattern '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// The node id does not exist in this document's arena.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    /// The operation requires an element (or a document) but got something else.
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    /// The node is not a child of the given parent.
    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// Appending would make a node its own ancestor.
    #[error("cannot append {child} under its own descendant {parent}")]
    Cycle { parent: NodeId, child: NodeId },

    /// An attribute expected to hold an integer held something else.
    #[error("attribute '{name}' on node {node} is not an integer: {value:?}")]
    InvalidNumber {
        node: NodeId,
        name: String,
        value: String,
    },

    /// The document has no root element.
    #[error("document has no root element")]
    NoDocumentElement,

    /// Text content was not valid UTF-8.
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Convenience alias for tree results.
pub type TreeResult<T> = Result<T, TreeError>;
