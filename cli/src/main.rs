use std::io::Write;
use std::thread;

use cmdkit_codec::document_flag;
use cmdkit_core::{
    App, Author, BoolFlag, Command, Context, DurationFlag, Error, IntFlag, OneOf, Signal,
    StringFlag, StringSliceFlag, copyright,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Settings file read when `CMDKIT_DEMO_SETTINGS` is unset.
const DEFAULT_SETTINGS: &str = "cmdkit-demo.yaml";

type ActionResult = Result<(), cmdkit_core::BoxError>;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let settings_path =
        std::env::var("CMDKIT_DEMO_SETTINGS").unwrap_or_else(|_| DEFAULT_SETTINGS.to_string());
    let settings = match document_flag("settings", &settings_path) {
        Ok(flag) => flag.with_usage("structured settings, read from the settings file"),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    let mut app = App::new()
        .with_usage("exercises the cmdkit command tree")
        .with_description(
            "Commands read flags from the command line, DEMO_* variables\n\
             and the settings file, in that order of precedence.",
        )
        .with_version(PACKAGE_VERSION)
        .with_author(Author::new("cmdkit contributors", ""))
        .with_copyright(copyright("cmdkit contributors"))
        .with_flag(
            StringFlag::new("region, r")
                .with_usage("deployment region")
                .with_env_var("DEMO_REGION")
                .with_value("local"),
        )
        .with_flag(settings)
        .with_command(greet_command())
        .with_command(wait_command())
        .with_command(fail_command())
        .with_command(env_command())
        .with_command(settings_command())
        .with_signals([Signal::Interrupt, Signal::Terminate, Signal::Hangup])
        .on_signal(|ctx, signal| {
            writeln!(ctx.err_writer(), "received {signal}, shutting down")?;
            Err(Error::new(format!("interrupted by {signal}"), signal_exit_code(signal)).into())
        });

    debug!(settings = %settings_path, "starting");
    std::process::exit(app.run(std::env::args()));
}

/// Shell convention: 128 plus the signal number.
fn signal_exit_code(signal: Signal) -> i32 {
    let number = match signal {
        Signal::Hangup => 1,
        Signal::Interrupt => 2,
        Signal::Quit => 3,
        Signal::User1 => 10,
        Signal::User2 => 12,
        Signal::Terminate => 15,
    };
    128 + number
}

fn greet_command() -> Command {
    Command::new("greet")
        .with_alias("g")
        .with_usage("prints a greeting")
        .with_args_usage("[suffix...]")
        .with_flag(
            StringFlag::new("name, n")
                .with_usage("who to greet")
                .with_env_var("DEMO_NAME")
                .with_value("world"),
        )
        .with_flag(
            IntFlag::new("times, t")
                .with_usage("how many greetings")
                .with_value(1),
        )
        .with_flag(BoolFlag::new("shout").with_usage("greet in capitals"))
        .with_action(greet)
}

fn greet(ctx: &Context<'_>) -> ActionResult {
    let mut line = format!(
        "hello {} from {}",
        ctx.string("name"),
        ctx.global_string("region")
    );
    for suffix in ctx.args() {
        line.push(' ');
        line.push_str(suffix);
    }
    if ctx.bool("shout") {
        line = line.to_uppercase();
    }

    let mut out = ctx.writer();
    for _ in 0..ctx.int("times") {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn wait_command() -> Command {
    Command::new("wait")
        .with_usage("blocks until a signal arrives or the timeout passes")
        .with_flag(
            DurationFlag::new("timeout")
                .with_usage("how long to wait")
                .with_env_var("DEMO_TIMEOUT")
                .with_value(chrono::Duration::seconds(30)),
        )
        .with_action(|ctx| {
            let timeout = ctx.duration("timeout");
            let mut out = ctx.writer();
            writeln!(out, "waiting for a signal")?;
            out.flush()?;

            info!(timeout_ms = timeout.num_milliseconds(), "waiting");
            thread::sleep(timeout.to_std()?);
            writeln!(out, "timed out")?;
            Ok(())
        })
}

fn fail_command() -> Command {
    Command::new("fail")
        .with_usage("exits with the requested code")
        .with_flag(
            IntFlag::new("code")
                .with_usage("exit code to report")
                .with_value(1),
        )
        .with_action(|ctx| Err(Error::new("failed on request", ctx.int("code")).into()))
}

fn env_command() -> Command {
    Command::new("env")
        .with_category("inspect")
        .with_usage("lists the environment variables matching current flag values")
        .with_flag(
            StringFlag::new("format")
                .with_usage("output format, text or json")
                .with_value("text")
                .with_validator(OneOf::new(["text", "json"])),
        )
        .with_flag(
            StringSliceFlag::new("tag")
                .with_usage("extra tags exported as DEMO_TAGS")
                .with_env_var("DEMO_TAGS"),
        )
        .with_action(|ctx| {
            let vars = ctx.env_vars();
            let mut out = ctx.writer();
            if ctx.string("format") == "json" {
                writeln!(out, "{}", serde_json::to_string_pretty(&vars)?)?;
                return Ok(());
            }
            for (key, value) in vars {
                writeln!(out, "{key}={value}")?;
            }
            Ok(())
        })
}

fn settings_command() -> Command {
    Command::new("settings")
        .with_category("inspect")
        .with_usage("prints the decoded settings document")
        .with_action(|ctx| {
            let settings = ctx.global_document("settings");
            let mut out = ctx.writer();
            if settings.is_null() {
                writeln!(out, "no settings loaded")?;
            } else {
                writeln!(out, "{}", serde_json::to_string_pretty(&settings)?)?;
            }
            Ok(())
        })
}
