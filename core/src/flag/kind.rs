//! Storage and parsing rules for each flag type.
//!
//! A [`Kind`] is a zero-sized marker that tells [`TypedFlag`](super::TypedFlag)
//! how to store, parse, render and snapshot its value. The public flag types
//! (`StringFlag`, `DurationFlag`, ...) are aliases of `TypedFlag<SomeKind>`.

use std::fmt::Write as _;
use std::io::Read;
use std::net::IpAddr;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use url::Url;

use crate::codec::{Codec, JsonCodec};

use super::parse::{
    ParseError, parse_bool, parse_duration, parse_float, parse_hardware_addr,
    parse_integer, unquote,
};
use super::value::{HardwareAddr, Value};

/// Type-level description of a flag's storage.
pub trait Kind: Sized + Send + Sync + 'static {
    /// Stored value.
    type Value: Clone + Send + Sync + 'static;
    /// Per-flag parsing options, such as a timestamp format.
    type Options: Default + Send + Sync + 'static;

    /// Type name used in messages.
    const NAME: &'static str;
    /// Boolean flags take no separate value on the command line.
    const IS_BOOL: bool = false;
    /// Sequence flags append on every write and reset once per phase.
    const IS_SEQUENCE: bool = false;
    /// Document flags receive environment values without comma splitting.
    const IS_DOCUMENT: bool = false;

    fn zero() -> Self::Value;

    fn parse(
        options: &Self::Options,
        current: &mut Self::Value,
        token: &str,
    ) -> Result<(), ParseError>;

    fn wrap(value: Self::Value) -> Value;

    fn unwrap(value: Value) -> Option<Self::Value>;

    /// Textual form that [`Kind::parse`] reads back to the same value.
    fn render(options: &Self::Options, value: &Self::Value) -> String {
        let _ = options;
        Self::wrap(value.clone()).to_string()
    }

    fn reset(value: &mut Self::Value) {
        let _ = value;
    }

    fn read_from(
        options: &Self::Options,
        current: &mut Self::Value,
        reader: &mut dyn Read,
    ) -> Result<(), ParseError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|err| ParseError::Read(err.to_string()))?;
        Self::parse(options, current, &text)
    }
}

macro_rules! scalar_kind {
    ($(#[$doc:meta])* $kind:ident, $ty:ty, $name:literal, $variant:ident, $zero:expr, $parse:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $kind;

        impl Kind for $kind {
            type Value = $ty;
            type Options = ();

            const NAME: &'static str = $name;

            fn zero() -> $ty {
                $zero
            }

            fn parse(_: &(), current: &mut $ty, token: &str) -> Result<(), ParseError> {
                *current = ($parse)(token)?;
                Ok(())
            }

            fn wrap(value: $ty) -> Value {
                Value::$variant(value)
            }

            fn unwrap(value: Value) -> Option<$ty> {
                match value {
                    Value::$variant(value) => Some(value),
                    _ => None,
                }
            }
        }
    };
}

scalar_kind!(
    /// Free text, stored verbatim.
    StringKind, String, "string", String, String::new(),
    |token: &str| Ok::<_, ParseError>(token.to_string())
);
scalar_kind!(
    /// A 32-bit signed integer.
    IntKind, i32, "int", Int, 0, |token: &str| parse_integer::<i32>(token, "int")
);
scalar_kind!(
    /// A 64-bit signed integer.
    Int64Kind, i64, "int64", Int64, 0, |token: &str| parse_integer::<i64>(token, "int64")
);
scalar_kind!(
    /// A 32-bit unsigned integer.
    UIntKind, u32, "uint", UInt, 0, |token: &str| parse_integer::<u32>(token, "uint")
);
scalar_kind!(
    /// A 64-bit unsigned integer.
    UInt64Kind, u64, "uint64", UInt64, 0, |token: &str| parse_integer::<u64>(token, "uint64")
);
scalar_kind!(
    /// A single-precision float.
    Float32Kind, f32, "float32", Float32, 0.0, |token: &str| parse_float::<f32>(token, "float32")
);
scalar_kind!(
    /// A double-precision float.
    Float64Kind, f64, "float64", Float64, 0.0, |token: &str| parse_float::<f64>(token, "float64")
);
scalar_kind!(
    /// A signed duration written as `1h30m`, `250ms`, `-5s`.
    DurationKind, chrono::Duration, "duration", Duration, chrono::Duration::zero(),
    parse_duration
);
scalar_kind!(
    /// A link-layer address.
    HardwareAddrKind, HardwareAddr, "hardware address", HardwareAddr, HardwareAddr::default(),
    parse_hardware_addr
);

/// A switch. On the command line `--flag` alone means `true`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolKind;

impl Kind for BoolKind {
    type Value = bool;
    type Options = ();

    const NAME: &'static str = "bool";
    const IS_BOOL: bool = true;

    fn zero() -> bool {
        false
    }

    fn parse(_: &(), current: &mut bool, token: &str) -> Result<(), ParseError> {
        *current = parse_bool(token)?;
        Ok(())
    }

    fn wrap(value: bool) -> Value {
        Value::Bool(value)
    }

    fn unwrap(value: Value) -> Option<bool> {
        value.as_bool()
    }
}

/// An ordered list of strings. Each write appends one token.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringSliceKind;

impl Kind for StringSliceKind {
    type Value = Vec<String>;
    type Options = ();

    const NAME: &'static str = "string slice";
    const IS_SEQUENCE: bool = true;

    fn zero() -> Vec<String> {
        Vec::new()
    }

    fn parse(_: &(), current: &mut Vec<String>, token: &str) -> Result<(), ParseError> {
        current.push(token.to_string());
        Ok(())
    }

    fn wrap(value: Vec<String>) -> Value {
        Value::StringSlice(value)
    }

    fn unwrap(value: Value) -> Option<Vec<String>> {
        match value {
            Value::StringSlice(value) => Some(value),
            _ => None,
        }
    }

    fn reset(value: &mut Vec<String>) {
        value.clear();
    }
}

/// Options of a timestamp flag.
#[derive(Debug, Clone, Default)]
pub struct TimestampOptions {
    /// A chrono format string. RFC 3339 when unset.
    pub format: Option<String>,
}

/// A point in time with its UTC offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampKind;

impl Kind for TimestampKind {
    type Value = Option<DateTime<FixedOffset>>;
    type Options = TimestampOptions;

    const NAME: &'static str = "timestamp";

    fn zero() -> Self::Value {
        None
    }

    fn parse(
        options: &TimestampOptions,
        current: &mut Self::Value,
        token: &str,
    ) -> Result<(), ParseError> {
        let text = token.trim();
        let parsed = match &options.format {
            None => DateTime::parse_from_rfc3339(text).map_err(|err| err.to_string()),
            Some(format) => parse_timestamp(text, format),
        };

        *current = Some(parsed.map_err(|reason| ParseError::Timestamp {
            input: text.to_string(),
            reason,
        })?);
        Ok(())
    }

    fn wrap(value: Self::Value) -> Value {
        Value::Timestamp(value)
    }

    fn unwrap(value: Value) -> Option<Self::Value> {
        match value {
            Value::Timestamp(value) => Some(value),
            _ => None,
        }
    }

    fn render(options: &TimestampOptions, value: &Self::Value) -> String {
        let Some(timestamp) = value else {
            return String::new();
        };
        let Some(format) = &options.format else {
            return timestamp.to_rfc3339();
        };

        let mut text = String::new();
        match write!(text, "{}", timestamp.format(format)) {
            Ok(()) => text,
            Err(_) => timestamp.to_rfc3339(),
        }
    }
}

/// Formats without an offset are read as UTC; date-only formats as midnight.
fn parse_timestamp(text: &str, format: &str) -> Result<DateTime<FixedOffset>, String> {
    let err = match DateTime::parse_from_str(text, format) {
        Ok(timestamp) => return Ok(timestamp),
        Err(err) => err.to_string(),
    };

    let naive = NaiveDateTime::parse_from_str(text, format).ok().or_else(|| {
        NaiveDate::parse_from_str(text, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    });

    match (naive, FixedOffset::east_opt(0)) {
        (Some(naive), Some(utc)) => Ok(utc.from_utc_datetime(&naive)),
        _ => Err(err),
    }
}

/// An absolute URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlKind;

impl Kind for UrlKind {
    type Value = Option<Url>;
    type Options = ();

    const NAME: &'static str = "url";

    fn zero() -> Self::Value {
        None
    }

    fn parse(_: &(), current: &mut Self::Value, token: &str) -> Result<(), ParseError> {
        let text = token.trim();
        let url = Url::parse(text).map_err(|err| ParseError::Url {
            input: text.to_string(),
            reason: err.to_string(),
        })?;
        *current = Some(url);
        Ok(())
    }

    fn wrap(value: Self::Value) -> Value {
        Value::Url(value)
    }

    fn unwrap(value: Value) -> Option<Self::Value> {
        match value {
            Value::Url(value) => Some(value),
            _ => None,
        }
    }
}

/// An IPv4 or IPv6 address.
#[derive(Debug, Clone, Copy, Default)]
pub struct IpKind;

impl Kind for IpKind {
    type Value = Option<IpAddr>;
    type Options = ();

    const NAME: &'static str = "ip";

    fn zero() -> Self::Value {
        None
    }

    fn parse(_: &(), current: &mut Self::Value, token: &str) -> Result<(), ParseError> {
        let text = token.trim();
        let ip = text
            .parse()
            .map_err(|_| ParseError::Ip(text.to_string()))?;
        *current = Some(ip);
        Ok(())
    }

    fn wrap(value: Self::Value) -> Value {
        Value::Ip(value)
    }

    fn unwrap(value: Value) -> Option<Self::Value> {
        match value {
            Value::Ip(value) => Some(value),
            _ => None,
        }
    }
}

/// Options of a document flag.
#[derive(Clone)]
pub struct DocumentOptions {
    pub codec: Arc<dyn Codec>,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            codec: Arc::new(JsonCodec),
        }
    }
}

/// A structured payload decoded by a [`Codec`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentKind;

impl Kind for DocumentKind {
    type Value = serde_json::Value;
    type Options = DocumentOptions;

    const NAME: &'static str = "document";
    const IS_DOCUMENT: bool = true;

    fn zero() -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Base64 payloads are decoded first when the codec accepts the decoded
    /// bytes; otherwise the token itself is decoded.
    fn parse(
        options: &DocumentOptions,
        current: &mut serde_json::Value,
        token: &str,
    ) -> Result<(), ParseError> {
        let text = unquote(token.trim());

        if let Ok(bytes) = BASE64.decode(text) {
            if let Ok(document) = options.codec.decode(&bytes) {
                *current = document;
                return Ok(());
            }
        }

        *current = options
            .codec
            .decode(text.as_bytes())
            .map_err(|err| ParseError::Document(err.to_string()))?;
        Ok(())
    }

    fn wrap(value: serde_json::Value) -> Value {
        Value::Document(value)
    }

    fn unwrap(value: Value) -> Option<serde_json::Value> {
        match value {
            Value::Document(value) => Some(value),
            _ => None,
        }
    }

    fn render(_: &DocumentOptions, value: &serde_json::Value) -> String {
        value.to_string()
    }

    fn reset(value: &mut serde_json::Value) {
        *value = serde_json::Value::Null;
    }

    fn read_from(
        options: &DocumentOptions,
        current: &mut serde_json::Value,
        reader: &mut dyn Read,
    ) -> Result<(), ParseError> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|err| ParseError::Read(err.to_string()))?;
        *current = options
            .codec
            .decode(&bytes)
            .map_err(|err| ParseError::Document(err.to_string()))?;
        Ok(())
    }
}
