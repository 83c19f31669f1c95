//! Token parsers shared by the flag kinds.
//!
//! Integers use base-0 parsing, booleans accept the canonical truthy and
//! falsy tokens and durations use the `1h30m0s` notation in both directions.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::value::HardwareAddr;

/// Errors raised while turning a token into a typed flag value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The token is not valid syntax for the flag's type.
    #[error("parsing {input:?}: invalid {kind} syntax")]
    Syntax { kind: &'static str, input: String },

    /// The token is well formed but does not fit the flag's type.
    #[error("parsing {input:?}: value out of range for {kind}")]
    Range { kind: &'static str, input: String },

    /// The token is not an absolute URL.
    #[error("invalid URL {input:?}: {reason}")]
    Url { input: String, reason: String },

    /// The token is not an IPv4 or IPv6 address.
    #[error("invalid IP address: {0}")]
    Ip(String),

    /// The token is not a MAC-48, EUI-64 or 20-octet address.
    #[error("invalid hardware address: {0}")]
    HardwareAddr(String),

    /// The token does not match the timestamp format.
    #[error("invalid timestamp {input:?}: {reason}")]
    Timestamp { input: String, reason: String },

    /// The codec rejected the payload.
    #[error("invalid document: {0}")]
    Document(String),

    /// The value stream could not be read.
    #[error("unable to read value: {0}")]
    Read(String),

    /// A snapshot of one kind was restored into a flag of another kind.
    #[error("cannot restore a {found} value into a {expected} flag")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl ParseError {
    fn syntax(kind: &'static str, input: &str) -> Self {
        Self::Syntax {
            kind,
            input: input.to_string(),
        }
    }

    fn range(kind: &'static str, input: &str) -> Self {
        Self::Range {
            kind,
            input: input.to_string(),
        }
    }
}

/// Parses an integer with base prefix detection: `0x` hex, `0o` or a leading
/// `0` octal, `0b` binary, decimal otherwise. Underscores are ignored.
pub(crate) fn parse_integer<T>(input: &str, kind: &'static str) -> Result<T, ParseError>
where
    T: TryFrom<i128>,
{
    let token = input.trim();
    let (negative, unsigned) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };

    let (radix, digits) = split_radix(unsigned);
    let digits: String = digits.chars().filter(|c| *c != '_').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(ParseError::syntax(kind, token));
    }

    let magnitude =
        u128::from_str_radix(&digits, radix).map_err(|_| ParseError::range(kind, token))?;
    let magnitude = i128::try_from(magnitude).map_err(|_| ParseError::range(kind, token))?;
    let value = if negative { -magnitude } else { magnitude };

    T::try_from(value).map_err(|_| ParseError::range(kind, token))
}

fn split_radix(token: &str) -> (u32, &str) {
    let lower = token.get(..2).map(str::to_ascii_lowercase);
    match lower.as_deref() {
        Some("0x") => (16, &token[2..]),
        Some("0o") => (8, &token[2..]),
        Some("0b") => (2, &token[2..]),
        _ if token.len() > 1 && token.starts_with('0') => (8, &token[1..]),
        _ => (10, token),
    }
}

/// Parses a floating point number.
pub(crate) fn parse_float<T: std::str::FromStr>(
    input: &str,
    kind: &'static str,
) -> Result<T, ParseError> {
    let token = input.trim();
    token.parse().map_err(|_| ParseError::syntax(kind, token))
}

/// Parses `1 t T TRUE true True` and `0 f F FALSE false False`.
pub(crate) fn parse_bool(input: &str) -> Result<bool, ParseError> {
    match input.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        token => Err(ParseError::syntax("bool", token)),
    }
}

const NANOSECOND: u128 = 1;
const MICROSECOND: u128 = 1_000 * NANOSECOND;
const MILLISECOND: u128 = 1_000 * MICROSECOND;
const SECOND: u128 = 1_000 * MILLISECOND;
const MINUTE: u128 = 60 * SECOND;
const HOUR: u128 = 60 * MINUTE;

static DURATION_COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]*)(?:\.([0-9]*))?(ns|us|µs|μs|ms|s|m|h)").expect("static regex must compile")
});

/// Parses a signed duration such as `300ms`, `-1.5h` or `2h45m`.
pub(crate) fn parse_duration(input: &str) -> Result<chrono::Duration, ParseError> {
    let token = input.trim();
    let (negative, mut rest) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };

    if rest == "0" {
        return Ok(chrono::Duration::zero());
    }
    if rest.is_empty() {
        return Err(ParseError::syntax("duration", token));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let caps = DURATION_COMPONENT
            .captures(rest)
            .ok_or_else(|| ParseError::syntax("duration", token))?;
        let whole = caps.get(1).map_or("", |m| m.as_str());
        let fraction = caps.get(2).map_or("", |m| m.as_str());
        if whole.is_empty() && fraction.is_empty() {
            return Err(ParseError::syntax("duration", token));
        }

        let unit = match caps.get(3).map_or("", |m| m.as_str()) {
            "ns" => NANOSECOND,
            "us" | "µs" | "μs" => MICROSECOND,
            "ms" => MILLISECOND,
            "s" => SECOND,
            "m" => MINUTE,
            _ => HOUR,
        };

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| ParseError::range("duration", token))?
        };
        let mut amount = whole
            .checked_mul(unit)
            .ok_or_else(|| ParseError::range("duration", token))?;

        // digits beyond nanosecond precision cannot change the result
        let fraction = &fraction[..fraction.len().min(24)];
        if !fraction.is_empty() {
            let scale = 10u128.pow(fraction.len() as u32);
            let digits: u128 = fraction
                .parse()
                .map_err(|_| ParseError::syntax("duration", token))?;
            amount += digits * unit / scale;
        }

        total = total
            .checked_add(amount)
            .ok_or_else(|| ParseError::range("duration", token))?;
        rest = &rest[caps.get(0).map_or(rest.len(), |m| m.end())..];
    }

    let limit = if negative {
        i64::MAX as u128 + 1
    } else {
        i64::MAX as u128
    };
    if total > limit {
        return Err(ParseError::range("duration", token));
    }

    let nanos = if negative {
        (-(total as i128)) as i64
    } else {
        total as i64
    };
    Ok(chrono::Duration::nanoseconds(nanos))
}

/// Renders a duration the way [`parse_duration`] reads it back: `1h30m0s`,
/// `1.5s`, `250ms`, `0s`.
pub(crate) fn format_duration(duration: chrono::Duration) -> String {
    let nanos =
        i128::from(duration.num_seconds()) * SECOND as i128 + i128::from(duration.subsec_nanos());
    if nanos == 0 {
        return "0s".to_string();
    }

    let sign = if nanos < 0 { "-" } else { "" };
    let value = nanos.unsigned_abs();

    let text = if value < MICROSECOND {
        format!("{value}ns")
    } else if value < MILLISECOND {
        format!("{}µs", decimal(value, 3))
    } else if value < SECOND {
        format!("{}ms", decimal(value, 6))
    } else {
        let mut text = format!("{}s", decimal(value % MINUTE, 9));
        let minutes = value / MINUTE;
        if minutes > 0 {
            text = format!("{}m{text}", minutes % 60);
            let hours = minutes / 60;
            if hours > 0 {
                text = format!("{hours}h{text}");
            }
        }
        text
    };

    format!("{sign}{text}")
}

fn decimal(value: u128, precision: u32) -> String {
    let scale = 10u128.pow(precision);
    let (whole, fraction) = (value / scale, value % scale);
    if fraction == 0 {
        return whole.to_string();
    }

    let fraction = format!("{fraction:0width$}", width = precision as usize);
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}

/// Parses `01:23:45:67:89:ab`, `01-23-45-67-89-ab` or `0123.4567.89ab`
/// forms of 6, 8 or 20 octets.
pub(crate) fn parse_hardware_addr(input: &str) -> Result<HardwareAddr, ParseError> {
    let token = input.trim();
    let invalid = || ParseError::HardwareAddr(token.to_string());

    let octets = if let Some(separator) = [':', '-'].into_iter().find(|s| token.contains(*s)) {
        token
            .split(separator)
            .map(|group| hex_group(group, 1))
            .collect::<Option<Vec<_>>>()
            .map(|groups| groups.concat())
    } else if token.contains('.') {
        token
            .split('.')
            .map(|group| hex_group(group, 2))
            .collect::<Option<Vec<_>>>()
            .map(|groups| groups.concat())
    } else {
        None
    };

    match octets {
        Some(octets) if matches!(octets.len(), 6 | 8 | 20) => Ok(HardwareAddr::from(octets)),
        _ => Err(invalid()),
    }
}

fn hex_group(group: &str, octets: usize) -> Option<Vec<u8>> {
    if group.len() != octets * 2 || !group.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    (0..octets)
        .map(|i| u8::from_str_radix(&group[i * 2..i * 2 + 2], 16).ok())
        .collect()
}

/// Removes one pair of surrounding single quotes. Unbalanced quotes are kept.
pub(crate) fn unquote(value: &str) -> &str {
    value
        .strip_prefix('\'')
        .and_then(|inner| inner.strip_suffix('\''))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer_detects_base() {
        assert_eq!(parse_integer::<i64>("42", "int64"), Ok(42));
        assert_eq!(parse_integer::<i64>("0x1F", "int64"), Ok(31));
        assert_eq!(parse_integer::<i64>("0o17", "int64"), Ok(15));
        assert_eq!(parse_integer::<i64>("017", "int64"), Ok(15));
        assert_eq!(parse_integer::<i64>("0b101", "int64"), Ok(5));
        assert_eq!(parse_integer::<i64>("-1_000", "int64"), Ok(-1000));
        assert_eq!(parse_integer::<i64>(" 7\n", "int64"), Ok(7));
        assert_eq!(parse_integer::<i64>("0", "int64"), Ok(0));
    }

    #[test]
    fn test_parse_integer_rejects_bad_input() {
        assert!(matches!(
            parse_integer::<i32>("abc", "int"),
            Err(ParseError::Syntax { .. })
        ));
        assert!(matches!(
            parse_integer::<i32>("0x", "int"),
            Err(ParseError::Syntax { .. })
        ));
        assert!(matches!(
            parse_integer::<i32>("089", "int"),
            Err(ParseError::Syntax { .. })
        ));
        assert!(matches!(
            parse_integer::<i32>("4294967296", "int"),
            Err(ParseError::Range { .. })
        ));
        assert!(matches!(
            parse_integer::<u32>("-1", "uint"),
            Err(ParseError::Range { .. })
        ));
    }

    #[test]
    fn test_parse_bool_tokens() {
        for token in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(token), Ok(true), "{token}");
        }
        for token in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(token), Ok(false), "{token}");
        }
        assert!(parse_bool("yes").is_err());
    }

    #[test]
    fn test_parse_duration_components() {
        let parse = |s| parse_duration(s).map(|d| d.num_milliseconds());
        assert_eq!(parse("10s"), Ok(10_000));
        assert_eq!(parse("1h30m"), Ok(5_400_000));
        assert_eq!(parse("1.5h"), Ok(5_400_000));
        assert_eq!(parse("-250ms"), Ok(-250));
        assert_eq!(parse("0"), Ok(0));
        assert_eq!(parse(".5s"), Ok(500));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("1x").is_err());
        assert!(parse_duration("s").is_err());
    }

    #[test]
    fn test_format_duration_canonical_form() {
        let format = |s| format_duration(parse_duration(s).expect("valid duration"));
        assert_eq!(format("1h30m"), "1h30m0s");
        assert_eq!(format("90s"), "1m30s");
        assert_eq!(format("1.5s"), "1.5s");
        assert_eq!(format("250ms"), "250ms");
        assert_eq!(format("1500us"), "1.5ms");
        assert_eq!(format("12ns"), "12ns");
        assert_eq!(format("-2m"), "-2m0s");
        assert_eq!(format("0"), "0s");
    }

    #[test]
    fn test_parse_hardware_addr_forms() {
        let expected = vec![0x00, 0x00, 0x5e, 0x00, 0x53, 0x01];
        for token in ["00:00:5e:00:53:01", "00-00-5E-00-53-01", "0000.5e00.5301"] {
            let addr = parse_hardware_addr(token).expect("valid address");
            assert_eq!(addr.as_bytes(), expected.as_slice(), "{token}");
        }
        assert!(parse_hardware_addr("00:00:5e").is_err());
        assert!(parse_hardware_addr("zz:00:5e:00:53:01").is_err());
        assert!(parse_hardware_addr("plain").is_err());
    }

    #[test]
    fn test_unquote_strips_one_matching_pair() {
        assert_eq!(unquote("'alice,bob'"), "alice,bob");
        assert_eq!(unquote("''x''"), "'x'");
        assert_eq!(unquote("'open"), "'open");
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(unquote("'"), "'");
    }
}
