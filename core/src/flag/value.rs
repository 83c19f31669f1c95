//! Typed snapshots of flag values.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use url::Url;

use super::parse::{ParseError, format_duration, parse_hardware_addr};

/// A link-layer address such as a MAC-48 or EUI-64.
///
/// # Examples
///
/// ```
/// use cmdkit_core::HardwareAddr;
///
/// let addr: HardwareAddr = "00:00:5e:00:53:01".parse().unwrap();
/// assert_eq!(addr.as_bytes().len(), 6);
/// assert_eq!(addr.to_string(), "00:00:5e:00:53:01");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HardwareAddr(Vec<u8>);

impl HardwareAddr {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for HardwareAddr {
    fn from(octets: Vec<u8>) -> Self {
        Self(octets)
    }
}

impl FromStr for HardwareAddr {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hardware_addr(s)
    }
}

impl fmt::Display for HardwareAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, octet) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{octet:02x}")?;
        }
        Ok(())
    }
}

/// Snapshot of a flag's current value, tagged with its type.
///
/// Optional types (`Timestamp`, `Url`, `Ip`) are `None` until a value is set;
/// documents are `Null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    StringSlice(Vec<String>),
    Bool(bool),
    Int(i32),
    Int64(i64),
    UInt(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Duration(chrono::Duration),
    Timestamp(Option<DateTime<FixedOffset>>),
    Url(Option<Url>),
    Ip(Option<IpAddr>),
    HardwareAddr(HardwareAddr),
    Document(serde_json::Value),
}

impl Value {
    /// Type name used in messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::StringSlice(_) => "string slice",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Int64(_) => "int64",
            Self::UInt(_) => "uint",
            Self::UInt64(_) => "uint64",
            Self::Float32(_) => "float32",
            Self::Float64(_) => "float64",
            Self::Duration(_) => "duration",
            Self::Timestamp(_) => "timestamp",
            Self::Url(_) => "url",
            Self::Ip(_) => "ip",
            Self::HardwareAddr(_) => "hardware address",
            Self::Document(_) => "document",
        }
    }

    /// Whether the value is the zero value of its type or empty.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::String(v) => v.is_empty(),
            Self::StringSlice(v) => v.is_empty(),
            Self::Bool(v) => !v,
            Self::Int(v) => *v == 0,
            Self::Int64(v) => *v == 0,
            Self::UInt(v) => *v == 0,
            Self::UInt64(v) => *v == 0,
            Self::Float32(v) => *v == 0.0,
            Self::Float64(v) => *v == 0.0,
            Self::Duration(v) => v.is_zero(),
            Self::Timestamp(v) => v.is_none(),
            Self::Url(v) => v.is_none(),
            Self::Ip(v) => v.is_none(),
            Self::HardwareAddr(v) => v.is_empty(),
            Self::Document(v) => match v {
                serde_json::Value::Null => true,
                serde_json::Value::Object(map) => map.is_empty(),
                serde_json::Value::Array(items) => items.is_empty(),
                serde_json::Value::String(text) => text.is_empty(),
                _ => false,
            },
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(v) => f.write_str(v),
            Self::StringSlice(v) => f.write_str(&v.join(", ")),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Duration(v) => f.write_str(&format_duration(*v)),
            Self::Timestamp(v) => match v {
                Some(v) => f.write_str(&v.to_rfc3339()),
                None => Ok(()),
            },
            Self::Url(v) => match v {
                Some(v) => f.write_str(v.as_str()),
                None => Ok(()),
            },
            Self::Ip(v) => match v {
                Some(v) => write!(f, "{v}"),
                None => Ok(()),
            },
            Self::HardwareAddr(v) => write!(f, "{v}"),
            Self::Document(v) => match v {
                serde_json::Value::Null => Ok(()),
                v => write!(f, "{v}"),
            },
        }
    }
}

macro_rules! impl_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

impl_from! {
    String(String),
    String(&str),
    StringSlice(Vec<String>),
    Bool(bool),
    Int(i32),
    Int64(i64),
    UInt(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Duration(chrono::Duration),
    HardwareAddr(HardwareAddr),
    Document(serde_json::Value),
}
