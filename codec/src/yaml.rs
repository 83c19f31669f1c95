//! YAML decoding for document flags.

use cmdkit_core::{BoxError, Codec};

/// Decodes YAML into the JSON-shaped tree document flags store.
///
/// Mappings need string keys; anything else fails to decode.
///
/// # Examples
///
/// ```
/// use cmdkit_codec::YamlCodec;
/// use cmdkit_core::Codec;
///
/// let tree = YamlCodec.decode(b"host: db.local\nports: [5432, 5433]\n").unwrap();
/// assert_eq!(tree["host"], "db.local");
/// assert_eq!(tree["ports"][1], 5433);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn decode(&self, bytes: &[u8]) -> Result<serde_json::Value, BoxError> {
        Ok(serde_yaml::from_slice(bytes)?)
    }
}
