//! Codec selection by file extension.

use std::fs;
use std::path::Path;

use cmdkit_core::{BoxError, Codec, DocumentFlag, JsonCodec};

use crate::error::{CodecError, Result};
use crate::yaml::YamlCodec;

/// Document formats recognized from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.json`
    Json,
    /// `.yaml` or `.yml`
    Yaml,
}

impl Format {
    /// Picks the format for `path` from its extension, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnsupportedExtension`] for any other extension
    /// or none at all.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(CodecError::UnsupportedExtension(
                path.display().to_string(),
            )),
        }
    }

    /// Decodes `bytes`, keeping the concrete error type.
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<serde_json::Value> {
        match self {
            Self::Json => Ok(serde_json::from_slice(bytes)?),
            Self::Yaml => Ok(serde_yaml::from_slice(bytes)?),
        }
    }
}

impl Codec for Format {
    fn decode(&self, bytes: &[u8]) -> std::result::Result<serde_json::Value, BoxError> {
        match self {
            Self::Json => JsonCodec.decode(bytes),
            Self::Yaml => YamlCodec.decode(bytes),
        }
    }
}

/// Codec for the file at `path`, chosen by extension.
///
/// # Examples
///
/// ```
/// use cmdkit_codec::{Format, codec_for_path};
///
/// assert_eq!(codec_for_path("config/app.YML").unwrap(), Format::Yaml);
/// assert!(codec_for_path("notes.txt").is_err());
/// ```
pub fn codec_for_path(path: impl AsRef<Path>) -> Result<Format> {
    Format::from_path(path)
}

/// Reads and decodes the document at `path`.
///
/// # Errors
///
/// Returns [`CodecError::IoError`] if the file cannot be read, or a decode
/// error matching the format.
pub fn decode_file(path: impl AsRef<Path>) -> Result<serde_json::Value> {
    let path = path.as_ref();
    let format = Format::from_path(path)?;
    let bytes = fs::read(path)?;
    format.decode_bytes(&bytes)
}

/// A document flag reading `path` with the codec its extension calls for.
///
/// # Examples
///
/// ```
/// use cmdkit_codec::document_flag;
/// use cmdkit_core::Flag;
///
/// let flag = document_flag("config, c", "settings.yaml").unwrap();
/// assert_eq!(flag.file_path(), "settings.yaml");
/// assert!(flag.is_document());
/// ```
pub fn document_flag(name: &str, path: impl AsRef<Path>) -> Result<DocumentFlag> {
    let path = path.as_ref();
    let format = Format::from_path(path)?;
    Ok(DocumentFlag::new(name)
        .with_file_path(path.to_string_lossy())
        .with_codec(format))
}
