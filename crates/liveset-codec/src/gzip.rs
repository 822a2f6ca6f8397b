//! Gzip framing of the project XML.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use crate::error::{CodecError, CodecResult};

/// The two magic bytes that open every gzip stream.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Returns `true` if `data` starts with the gzip magic bytes.
pub fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[..2] == GZIP_MAGIC
}

/// Decode project bytes into XML text.
///
/// Gzip input is inflated; anything else is taken to be plain XML, which
/// lets already-unpacked sets be read the same way.
pub fn decompress(data: &[u8]) -> CodecResult<String> {
    if !is_gzip(data) {
        debug!(bytes = data.len(), "input is not gzip, reading as plain XML");
        return Ok(String::from_utf8(data.to_vec())?);
    }
    let mut decoder = GzDecoder::new(data);
    let mut inflated = Vec::new();
    decoder
        .read_to_end(&mut inflated)
        .map_err(|e| CodecError::DecompressionFailed(e.to_string()))?;
    debug!(compressed = data.len(), inflated = inflated.len(), "inflated project");
    Ok(String::from_utf8(inflated)?)
}

/// Encode XML text as a gzip stream.
pub fn compress(xml: &str) -> CodecResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(xml.as_bytes())
        .map_err(|e| CodecError::CompressionFailed(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CodecError::CompressionFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Ableton/>\n";

    #[test]
    fn compressed_output_has_gzip_magic() {
        let packed = compress(XML).unwrap();
        assert!(is_gzip(&packed));
        assert_eq!(decompress(&packed).unwrap(), XML);
    }

    #[test]
    fn plain_xml_passes_through() {
        assert_eq!(decompress(XML.as_bytes()).unwrap(), XML);
    }

    #[test]
    fn truncated_gzip_fails() {
        let packed = compress(XML).unwrap();
        let truncated = &packed[..packed.len() / 2];
        assert!(matches!(
            decompress(truncated),
            Err(CodecError::DecompressionFailed(_))
        ));
    }

    #[test]
    fn invalid_utf8_is_reported() {
        assert!(matches!(decompress(&[0xff, 0xfe, 0x00]), Err(CodecError::Utf8(_))));
    }
}
