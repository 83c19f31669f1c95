use tracing::debug;

use crate::accessor::FlagAccessor;
use crate::context::Context;
use crate::error::{EXIT_CODE_FLAG_PROCESSING, Error, ExitError, Result};
use crate::flag::ParseError;

use super::Provider;

/// Parses flags from the context's positional arguments.
///
/// Accepts `--name`, `--name value`, `--name=value` and the same forms with
/// a single dash. Boolean flags never consume the next token. Parsing stops
/// at `--` (which is dropped) or at the first token that is not a flag; the
/// remaining tokens become the context's arguments. On error the arguments
/// are left untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArgsProvider;

impl Provider for ArgsProvider {
    fn provide(&self, ctx: &mut Context<'_>) -> Result<()> {
        let mut accessors = ctx.flags();
        let rest = parse(&mut accessors, ctx.args())?;
        drop(accessors);

        debug!(command = %ctx.command().name, remaining = rest.len(), "parsed command line flags");
        *ctx.args_mut() = rest;
        Ok(())
    }
}

fn parse(accessors: &mut [FlagAccessor<'_>], args: &[String]) -> Result<Vec<String>> {
    let mut index = 0;

    while index < args.len() {
        let arg = args[index].as_str();
        if arg.len() < 2 || !arg.starts_with('-') {
            break;
        }
        if arg == "--" {
            index += 1;
            break;
        }

        let dashes = if arg.starts_with("--") { 2 } else { 1 };
        let name = &arg[dashes..];
        if name.is_empty() || name.starts_with('-') || name.starts_with('=') {
            return Err(usage(format!("bad flag syntax: {arg}")));
        }
        index += 1;

        let (name, inline) = match name.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (name, None),
        };

        let position = accessors
            .iter()
            .position(|accessor| accessor.names().contains(&name))
            .or_else(|| accessors.iter().position(|accessor| accessor.matches(name)));
        let Some(position) = position else {
            return Err(usage(format!("flag provided but not defined: -{name}")));
        };
        let accessor = &mut accessors[position];

        if accessor.is_bool_flag() {
            let value = inline.unwrap_or("true");
            accessor
                .set(value)
                .map_err(|err| invalid(format!("invalid boolean value {value:?} for -{name}"), err))?;
            continue;
        }

        let value = match inline {
            Some(value) => value,
            None if index < args.len() => {
                index += 1;
                args[index - 1].as_str()
            }
            None => return Err(usage(format!("flag needs an argument: -{name}"))),
        };
        accessor
            .set(value)
            .map_err(|err| invalid(format!("invalid value {value:?} for flag -{name}"), err))?;
    }

    Ok(args[index..].to_vec())
}

fn usage(message: String) -> Error {
    Error::new(message, EXIT_CODE_FLAG_PROCESSING)
}

fn invalid(prefix: String, err: ParseError) -> Error {
    let message = format!("{prefix}: {err}");
    ExitError::new(message, EXIT_CODE_FLAG_PROCESSING)
        .with_cause(err)
        .into()
}

#[cfg(test)]
mod tests {
    use crate::command::Command;
    use crate::context::Invocation;
    use crate::flag::{BoolFlag, DurationFlag, IntFlag, StringSliceFlag};

    use super::*;

    fn app() -> Command {
        Command::new("app")
            .with_flag(IntFlag::new("port, p").with_value(80))
            .with_flag(BoolFlag::new("verbose, V"))
            .with_flag(StringSliceFlag::new("user").with_value(vec!["root".to_string()]))
            .with_flag(DurationFlag::new("timeout"))
    }

    fn provide(app: &Command, args: &[&str]) -> (Result<()>, Vec<String>) {
        let mut ctx = Context::new(app, Invocation::new(args.iter().copied()));
        let result = ArgsProvider.provide(&mut ctx);
        (result, ctx.args().to_vec())
    }

    #[test]
    fn test_long_and_short_forms() {
        let app = app();
        let (result, rest) = provide(&app, &["-p", "8080", "--verbose", "--timeout=1m", "run", "--port", "1"]);
        result.unwrap();
        assert_eq!(rest, ["run", "--port", "1"]);

        let ctx = Context::new(&app, Invocation::new(Vec::<String>::new()));
        assert_eq!(ctx.int("port"), 8080);
        assert!(ctx.bool("verbose"));
        assert_eq!(ctx.duration("timeout"), chrono::Duration::minutes(1));
    }

    #[test]
    fn test_single_dash_accepts_long_name_and_inline_value() {
        let app = app();
        let (result, rest) = provide(&app, &["-port=9000", "-V=false"]);
        result.unwrap();
        assert!(rest.is_empty());

        let ctx = Context::new(&app, Invocation::new(Vec::<String>::new()));
        assert_eq!(ctx.int("port"), 9000);
        assert!(!ctx.bool("verbose"));
    }

    #[test]
    fn test_double_dash_ends_flags() {
        let app = app();
        let (result, rest) = provide(&app, &["--", "--port", "1"]);
        result.unwrap();
        assert_eq!(rest, ["--port", "1"]);
    }

    #[test]
    fn test_sequence_replaces_default() {
        let app = app();
        let (result, _) = provide(&app, &["--user", "alice", "--user", "bob"]);
        result.unwrap();

        let ctx = Context::new(&app, Invocation::new(Vec::<String>::new()));
        assert_eq!(ctx.string_slice("user"), ["alice", "bob"]);
    }

    #[test]
    fn test_error_messages() {
        let app = app();

        let (result, rest) = provide(&app, &["--missing", "x"]);
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "flag provided but not defined: -missing");
        assert_eq!(err.code(), EXIT_CODE_FLAG_PROCESSING);
        assert_eq!(rest, ["--missing", "x"]);

        let (result, _) = provide(&app, &["--port"]);
        assert_eq!(result.unwrap_err().to_string(), "flag needs an argument: -port");

        let (result, _) = provide(&app, &["--port", "eighty"]);
        let err = result.unwrap_err();
        assert!(err.to_string().starts_with(r#"invalid value "eighty" for flag -port: "#));

        let (result, _) = provide(&app, &["---port"]);
        assert_eq!(result.unwrap_err().to_string(), "bad flag syntax: ---port");
    }
}
