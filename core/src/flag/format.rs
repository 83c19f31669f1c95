//! One-line rendering of a flag for help output.

use std::fmt::Write as _;

use super::{Flag, split};

/// Renders a flag as `--name value, -n value<TAB>usage (default: x) [$ENV] [file]`.
///
/// Single-letter aliases get one dash. Boolean flags omit the ` value`
/// placeholder and the default.
///
/// # Examples
///
/// ```
/// use cmdkit_core::{format_flag, BoolFlag, StringFlag};
///
/// let level = StringFlag::new("log-level, l")
///     .with_usage("Application log level")
///     .with_env_var("LOG_LEVEL,LOG_LVL")
///     .with_file_path("my-config.cfg")
///     .with_value("info");
/// assert_eq!(
///     format_flag(&level),
///     "--log-level value, -l value\tApplication log level (default: info) [$LOG_LEVEL, $LOG_LVL] [my-config.cfg]"
/// );
///
/// let debug = BoolFlag::new("debug, d").with_usage("Debug mode").with_value(true);
/// assert_eq!(format_flag(&debug), "--debug, -d\tDebug mode");
/// ```
pub fn format_flag(flag: &dyn Flag) -> String {
    let mut out = String::new();
    let placeholder = if flag.is_bool_flag() { "" } else { " value" };

    for (index, name) in split(flag.name()).enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        let dashes = if name.chars().count() == 1 { "-" } else { "--" };
        let _ = write!(out, "{dashes}{name}{placeholder}");
    }

    let usage = flag.usage();
    if !usage.is_empty() {
        if !out.is_empty() {
            out.push('\t');
        }
        out.push_str(usage);
    }

    let default = default_text(flag);
    if !default.is_empty() {
        push_separated(&mut out, &format!("(default: {default})"));
    }

    let envs: Vec<String> = split(flag.env_var()).map(|env| format!("${env}")).collect();
    if !envs.is_empty() {
        push_separated(&mut out, &format!("[{}]", envs.join(", ")));
    }

    let path = flag.file_path().trim();
    if !path.is_empty() {
        push_separated(&mut out, &format!("[{path}]"));
    }

    out
}

/// Text shown as `(default: ...)`: empty for booleans and zero values.
pub fn default_text(flag: &dyn Flag) -> String {
    if flag.is_bool_flag() || flag.value().is_zero() {
        return String::new();
    }
    flag.render()
}

fn push_separated(out: &mut String, item: &str) {
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(item);
}
