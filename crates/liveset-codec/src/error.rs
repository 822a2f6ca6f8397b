use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("project is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("document error: {0}")]
    Tree(#[from] liveset_tree::TreeError),
}

pub type CodecResult<T> = Result<T, CodecError>;
