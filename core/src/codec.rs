//! Payload decoders for document flags.
//!
//! A document flag hands its raw bytes to a [`Codec`] and stores the decoded
//! tree as a [`serde_json::Value`]. [`JsonCodec`] is the default; other
//! formats plug in by implementing the trait.

use crate::error::BoxError;

/// Decodes raw bytes into a document tree.
pub trait Codec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<serde_json::Value, BoxError>;
}

/// JSON decoding through `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn decode(&self, bytes: &[u8]) -> Result<serde_json::Value, BoxError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl<F> Codec for F
where
    F: Fn(&[u8]) -> Result<serde_json::Value, BoxError> + Send + Sync,
{
    fn decode(&self, bytes: &[u8]) -> Result<serde_json::Value, BoxError> {
        self(bytes)
    }
}
