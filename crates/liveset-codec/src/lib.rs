//! Container codec for Live set files.
//!
//! A `.als` file is the set's XML document wrapped in a gzip stream. This
//! crate handles that framing and the load/save round trip to a
//! [`liveset_tree::Document`].

pub mod error;
pub mod gzip;
pub mod project;

pub use error::{CodecError, CodecResult};
pub use gzip::{compress, decompress, is_gzip};
pub use project::{load_document, load_xml, save_document, save_xml};
