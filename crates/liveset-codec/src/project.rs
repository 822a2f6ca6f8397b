//! Reading and writing whole project files.

use std::path::Path;

use liveset_tree::Document;
use tracing::info;

use crate::error::{CodecError, CodecResult};
use crate::gzip::{compress, decompress};

fn io_error(path: &Path, source: std::io::Error) -> CodecError {
    CodecError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Read and parse a project file (gzip or plain XML).
pub fn load_document(path: &Path) -> CodecResult<Document> {
    let data = std::fs::read(path).map_err(|e| io_error(path, e))?;
    let xml = decompress(&data)?;
    let doc = Document::parse(&xml)?;
    info!(path = %path.display(), nodes = doc.len(), "loaded project");
    Ok(doc)
}

/// Read a project file and return its XML text without parsing it.
pub fn load_xml(path: &Path) -> CodecResult<String> {
    let data = std::fs::read(path).map_err(|e| io_error(path, e))?;
    decompress(&data)
}

/// Serialize and gzip a document to `path`.
pub fn save_document(path: &Path, doc: &Document) -> CodecResult<()> {
    let xml = doc.to_xml_string()?;
    let packed = compress(&xml)?;
    std::fs::write(path, &packed).map_err(|e| io_error(path, e))?;
    info!(path = %path.display(), bytes = packed.len(), "saved project");
    Ok(())
}

/// Write a document as formatted, uncompressed XML.
pub fn save_xml(path: &Path, doc: &Document) -> CodecResult<()> {
    let xml = doc.to_xml_string()?;
    std::fs::write(path, xml).map_err(|e| io_error(path, e))
}
