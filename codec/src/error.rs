//! Error types for document decoding.

use thiserror::Error;

/// Errors that can occur while choosing a codec or decoding a document.
#[derive(Debug, Error)]
pub enum CodecError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// No codec is registered for the file extension.
    #[error("unsupported document extension: {0}")]
    UnsupportedExtension(String),
}

/// Convenience alias for results with [`CodecError`].
pub type Result<T> = std::result::Result<T, CodecError>;
