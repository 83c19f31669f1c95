//! Typed flags.
//!
//! Every flag is a [`TypedFlag`] parameterized by a [`Kind`] that decides how
//! tokens are parsed and stored. The [`Flag`] trait erases the kind so a
//! command can hold flags of any type, and publishes each flag's attributes
//! without reflection.
//!
//! # Example
//!
//! ```
//! use cmdkit_core::{DurationFlag, Flag, StringSliceFlag};
//!
//! let mut timeout = DurationFlag::new("timeout, t")
//!     .with_usage("request timeout")
//!     .with_env_var("TIMEOUT")
//!     .with_value(chrono::Duration::seconds(30));
//! timeout.set("1m30s").unwrap();
//! assert_eq!(timeout.render(), "1m30s");
//!
//! let mut users = StringSliceFlag::new("user");
//! users.set("alice").unwrap();
//! users.set("bob").unwrap();
//! assert_eq!(users.value, vec!["alice", "bob"]);
//! ```

mod format;
mod kind;
mod parse;
mod validator;
mod value;

use std::io::Read;
use std::sync::Arc;

use crate::codec::Codec;
use crate::context::Context;
use crate::error::{Error, Result};

pub use format::{default_text, format_flag};
pub use kind::{
    BoolKind, DocumentKind, DocumentOptions, DurationKind, Float32Kind, Float64Kind,
    HardwareAddrKind, Int64Kind, IntKind, IpKind, Kind, StringKind, StringSliceKind,
    TimestampKind, TimestampOptions, UInt64Kind, UIntKind, UrlKind,
};
pub use parse::ParseError;
pub use validator::{OneOf, UnsupportedValue, Validator, ValidatorFn};
pub use value::{HardwareAddr, Value};

pub(crate) use parse::unquote;

/// A named, typed configuration slot.
///
/// Attribute strings are raw: `name` may list comma-separated aliases
/// (`"log-level, l"`), `env_var` and `file_path` comma-separated keys and
/// globs. Use [`split`] to break them apart.
pub trait Flag: Send + Sync {
    fn name(&self) -> &str;
    fn usage(&self) -> &str;
    fn env_var(&self) -> &str;
    fn file_path(&self) -> &str;
    fn hidden(&self) -> bool;
    fn required(&self) -> bool;

    /// Snapshot of the current value.
    fn value(&self) -> Value;

    /// Textual form of the current value that [`Flag::set`] reads back.
    fn render(&self) -> String;

    /// Parses one token into the flag.
    fn set(&mut self, token: &str) -> std::result::Result<(), ParseError>;

    /// Replaces the value with a snapshot taken from a flag of the same kind.
    fn restore(&mut self, value: Value) -> std::result::Result<(), ParseError>;

    /// Clears accumulated state before the first write of a phase.
    fn reset(&mut self) {}

    /// Feeds the whole stream to the flag.
    fn read_from(&mut self, reader: &mut dyn Read) -> std::result::Result<(), ParseError>;

    fn validator(&self) -> Option<Arc<dyn Validator>> {
        None
    }

    fn is_bool_flag(&self) -> bool {
        false
    }

    fn is_sequence(&self) -> bool {
        false
    }

    fn is_document(&self) -> bool {
        false
    }

    /// Fails with `flag '<name>' not found` when required and zero, then
    /// runs the attached validator.
    fn validate(&self, ctx: &Context<'_>) -> Result<()> {
        check(
            primary_name(self.name()),
            self.required(),
            &self.value(),
            self.validator().as_deref(),
            ctx,
        )
    }
}

pub(crate) fn check(
    name: &str,
    required: bool,
    value: &Value,
    validator: Option<&dyn Validator>,
    ctx: &Context<'_>,
) -> Result<()> {
    if required && value.is_zero() {
        return Err(Error::not_found_flag(name));
    }

    match validator {
        Some(validator) => validator.validate(ctx, value).map_err(Error::from_boxed),
        None => Ok(()),
    }
}

/// Splits a comma-separated attribute into trimmed, non-empty items.
///
/// # Examples
///
/// ```
/// let names: Vec<_> = cmdkit_core::split(" log-level , l ").collect();
/// assert_eq!(names, ["log-level", "l"]);
/// ```
pub fn split(text: &str) -> impl Iterator<Item = &str> {
    text.split(',').map(str::trim).filter(|item| !item.is_empty())
}

/// First alias of a name list.
pub(crate) fn primary_name(name: &str) -> &str {
    split(name).next().unwrap_or_default()
}

/// Upper-cases and joins environment variable names for `with_env_var`.
///
/// # Examples
///
/// ```
/// assert_eq!(cmdkit_core::env_of(["log_level", " log_lvl"]), "LOG_LEVEL, LOG_LVL");
/// ```
pub fn env_of<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|item| item.as_ref().trim().to_uppercase())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A flag whose storage is described by `K`.
///
/// Fields are public so flags can be declared with struct syntax as well as
/// with the builder methods.
pub struct TypedFlag<K: Kind> {
    /// Comma-separated aliases; the first is the primary name.
    pub name: String,
    pub usage: String,
    /// Comma-separated environment variable keys, in priority order.
    pub env_var: String,
    /// Comma-separated file paths or glob patterns.
    pub file_path: String,
    /// Current value. Holds the default until a provider writes it.
    pub value: K::Value,
    pub hidden: bool,
    pub required: bool,
    pub validator: Option<Arc<dyn Validator>>,
    options: K::Options,
}

impl<K: Kind> TypedFlag<K> {
    /// Creates a flag holding the zero value of its type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            usage: String::new(),
            env_var: String::new(),
            file_path: String::new(),
            value: K::zero(),
            hidden: false,
            required: false,
            validator: None,
            options: K::Options::default(),
        }
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    pub fn with_env_var(mut self, env_var: impl Into<String>) -> Self {
        self.env_var = env_var.into();
        self
    }

    pub fn with_file_path(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = file_path.into();
        self
    }

    /// Sets the default value.
    pub fn with_value(mut self, value: impl Into<K::Value>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn mark_required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn mark_hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

impl TypedFlag<TimestampKind> {
    /// Parses and renders with a chrono format string instead of RFC 3339.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.options.format = Some(format.into());
        self
    }
}

impl TypedFlag<DocumentKind> {
    /// Decodes payloads with `codec` instead of JSON.
    pub fn with_codec(mut self, codec: impl Codec + 'static) -> Self {
        self.options.codec = Arc::new(codec);
        self
    }
}

impl<K: Kind> Flag for TypedFlag<K> {
    fn name(&self) -> &str {
        &self.name
    }

    fn usage(&self) -> &str {
        &self.usage
    }

    fn env_var(&self) -> &str {
        &self.env_var
    }

    fn file_path(&self) -> &str {
        &self.file_path
    }

    fn hidden(&self) -> bool {
        self.hidden
    }

    fn required(&self) -> bool {
        self.required
    }

    fn value(&self) -> Value {
        K::wrap(self.value.clone())
    }

    fn render(&self) -> String {
        K::render(&self.options, &self.value)
    }

    fn set(&mut self, token: &str) -> std::result::Result<(), ParseError> {
        K::parse(&self.options, &mut self.value, token)
    }

    fn restore(&mut self, value: Value) -> std::result::Result<(), ParseError> {
        let found = value.kind();
        self.value = K::unwrap(value).ok_or(ParseError::Mismatch {
            expected: K::NAME,
            found,
        })?;
        Ok(())
    }

    fn reset(&mut self) {
        K::reset(&mut self.value);
    }

    fn read_from(&mut self, reader: &mut dyn Read) -> std::result::Result<(), ParseError> {
        K::read_from(&self.options, &mut self.value, reader)
    }

    fn validator(&self) -> Option<Arc<dyn Validator>> {
        self.validator.clone()
    }

    fn is_bool_flag(&self) -> bool {
        K::IS_BOOL
    }

    fn is_sequence(&self) -> bool {
        K::IS_SEQUENCE
    }

    fn is_document(&self) -> bool {
        K::IS_DOCUMENT
    }
}

pub type StringFlag = TypedFlag<StringKind>;
pub type StringSliceFlag = TypedFlag<StringSliceKind>;
pub type BoolFlag = TypedFlag<BoolKind>;
pub type IntFlag = TypedFlag<IntKind>;
pub type Int64Flag = TypedFlag<Int64Kind>;
pub type UIntFlag = TypedFlag<UIntKind>;
pub type UInt64Flag = TypedFlag<UInt64Kind>;
pub type Float32Flag = TypedFlag<Float32Kind>;
pub type Float64Flag = TypedFlag<Float64Kind>;
pub type DurationFlag = TypedFlag<DurationKind>;
pub type TimestampFlag = TypedFlag<TimestampKind>;
pub type UrlFlag = TypedFlag<UrlKind>;
pub type IpFlag = TypedFlag<IpKind>;
pub type HardwareAddrFlag = TypedFlag<HardwareAddrKind>;
pub type DocumentFlag = TypedFlag<DocumentKind>;

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_bool_flag_reports_bool_capability() {
        let flag = BoolFlag::new("verbose, V");
        assert!(flag.is_bool_flag());
        assert!(!flag.is_sequence());
        assert_eq!(primary_name(flag.name()), "verbose");
    }

    #[test]
    fn test_scalar_flags_trim_file_contents() {
        let mut port = IntFlag::new("port");
        port.set("8080\n").unwrap();
        assert_eq!(port.value, 8080);

        let mut ratio = Float64Flag::new("ratio");
        ratio.set(" 0.25 ").unwrap();
        assert_eq!(ratio.value, 0.25);

        let mut ip = IpFlag::new("listen-addr");
        ip.set("127.0.0.1\n").unwrap();
        assert_eq!(ip.value, Some(IpAddr::V4(Ipv4Addr::LOCALHOST)));
    }

    #[test]
    fn test_string_flag_keeps_token_verbatim() {
        let mut name = StringFlag::new("name");
        name.set(" spaced ").unwrap();
        assert_eq!(name.value, " spaced ");
    }

    #[test]
    fn test_ip_flag_rejects_bare_port() {
        let mut ip = IpFlag::new("listen-addr");
        let err = ip.set("9292").unwrap_err();
        assert_eq!(err.to_string(), "invalid IP address: 9292");
    }

    #[test]
    fn test_url_flag_requires_absolute_url() {
        let mut url = UrlFlag::new("endpoint");
        assert!(url.set("://wrong").is_err());
        url.set("https://example.com/api").unwrap();
        assert_eq!(url.render(), "https://example.com/api");
    }

    #[test]
    fn test_timestamp_flag_formats() {
        let mut started = TimestampFlag::new("started");
        started.set("2024-03-01T10:00:00+02:00").unwrap();
        assert_eq!(started.render(), "2024-03-01T10:00:00+02:00");

        let mut day = TimestampFlag::new("day").with_format("%Y-%m-%d");
        day.set("2024-03-01").unwrap();
        assert_eq!(day.render(), "2024-03-01");
        assert!(day.set("01/03/2024").is_err());
    }

    #[test]
    fn test_sequence_reset_clears_default() {
        let mut users = StringSliceFlag::new("user").with_value(vec!["root".to_string()]);
        users.reset();
        users.set("alice").unwrap();
        assert_eq!(users.value, vec!["alice"]);
    }

    #[test]
    fn test_document_flag_accepts_literal_and_base64() {
        let mut config = DocumentFlag::new("config");
        config.set(r#"'{"port": 80}'"#).unwrap();
        assert_eq!(config.value, json!({"port": 80}));

        let encoded = STANDARD.encode(br#"{"port": 81}"#);
        config.set(&encoded).unwrap();
        assert_eq!(config.value, json!({"port": 81}));

        assert!(config.set("{broken").is_err());
    }

    #[test]
    fn test_document_flag_reads_stream() {
        let mut config = DocumentFlag::new("config");
        let mut reader: &[u8] = br#"{"debug": true}"#;
        config.read_from(&mut reader).unwrap();
        assert_eq!(config.value, json!({"debug": true}));
    }

    #[test]
    fn test_restore_rejects_other_kind() {
        let mut port = IntFlag::new("port");
        port.restore(Value::Int(9)).unwrap();
        assert_eq!(port.value, 9);
        assert_eq!(
            port.restore(Value::Bool(true)),
            Err(ParseError::Mismatch {
                expected: "int",
                found: "bool"
            })
        );
    }

    #[test]
    fn test_env_of_uppercases() {
        assert_eq!(env_of(["app_port"]), "APP_PORT");
    }
}
