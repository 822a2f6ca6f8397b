//! Track extraction for Live set documents.
//!
//! Slices a parsed set into per-entity fragments (tracks, master track,
//! scenes, locators), stamps every track with its document-order
//! predecessor, and captures document-level scalars such as the next free
//! pointee id.

pub mod error;
pub mod paths;
pub mod schema;
pub mod split;
pub mod summary;

pub use error::{ExtractError, ExtractResult};
pub use paths::{DocumentPaths, NamedPath};
pub use split::{split, Extraction, Fragment};
pub use summary::{analyse, ProjectSummary, TrackSummary};
