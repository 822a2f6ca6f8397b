//! Node access layer for Live set documents.
//!
//! A Live set (`.als`) is a gzip-compressed XML document. This crate holds
//! the decompressed XML as an arena of nodes so that callers can detach,
//! move, and re-attach subtrees while keeping plain [`NodeId`] handles to
//! them.
//!
//! # Key Types
//!
//! - [`Document`] -- the arena, with attribute and child mutation
//! - [`NodeId`] -- stable handle to a node
//! - [`NodePath`] -- structural path patterns (`/Ableton/LiveSet/Tracks/*`)

pub mod document;
pub mod error;
pub mod path;
pub mod xml;

pub use document::{Attribute, Document, Element, NodeId, NodeKind};
pub use error::{TreeError, TreeResult};
pub use path::{NodePath, Predicate};
