//! Application shell: the root command plus process-level concerns.
//!
//! [`App`] derives the program name from `argv[0]`, installs the `--version`
//! flag and `version` subcommand, watches signals and turns the final error
//! into an exit code.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use cmdkit_core::{App, Buffer, Command, Error};
//!
//! let out = Buffer::default();
//! let code = Arc::new(Mutex::new(None));
//! let exit = code.clone();
//!
//! let mut app = App::new()
//!     .with_version("1.2.0")
//!     .with_writer(out.clone())
//!     .with_err_writer(out.clone())
//!     .with_exit(move |status| *exit.lock().unwrap() = Some(status))
//!     .with_command(Command::new("fail").with_action(|_| Err(Error::new("nope", 3).into())));
//!
//! assert_eq!(app.run(["/usr/bin/tool", "fail"]), 3);
//! assert_eq!(out.contents(), "nope\n");
//! assert_eq!(*code.lock().unwrap(), Some(3));
//!
//! out.clear();
//! assert_eq!(app.run(["/usr/bin/tool", "--version"]), 0);
//! assert_eq!(out.contents(), "tool version 1.2.0\n");
//! ```

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Local};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::Command;
use crate::context::{Context, Environment, Invocation, Metadata};
use crate::error::{BoxError, EXIT_CODE_FAILURE, EXIT_CODE_SUCCESS, Error};
use crate::flag::{BoolFlag, Flag};
use crate::help::{HelpPrinter, version_command};
use crate::io::Writer;
use crate::provider::Provider;
use crate::retry::BackOff;
use crate::signal::{self, Signal};

/// Root metadata key: the application version.
pub const METADATA_VERSION: &str = "Version";
/// Root metadata key: whether the version is hidden from help.
pub const METADATA_HIDE_VERSION: &str = "HideVersion";
/// Root metadata key: the authors, rendered as `Name <email>`.
pub const METADATA_AUTHORS: &str = "Authors";
/// Root metadata key: the copyright line.
pub const METADATA_COPYRIGHT: &str = "Copyright";

/// Handles a delivered signal with the root context.
pub type SignalFn = Box<dyn Fn(&Context<'_>, Signal) -> Result<(), BoxError> + Send + Sync>;

/// Rewrites or suppresses (by returning `None`) the error about to end the
/// process.
pub type ExitErrorFn = Box<dyn Fn(Error) -> Option<Error> + Send + Sync>;

/// Terminates the process with a code.
pub type ExitFn = Box<dyn Fn(i32) + Send + Sync>;

/// Someone who contributed to the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.email.is_empty() {
            write!(f, " <{}>", self.email)?;
        }
        Ok(())
    }
}

/// Copyright line for the current year: `<name> (C) <year>`.
pub fn copyright(name: &str) -> String {
    format!("{name} (C) {}", Local::now().year())
}

fn exit_process(code: i32) {
    std::process::exit(code)
}

/// A command-line application.
pub struct App {
    command: Command,
    version: String,
    hide_version: bool,
    authors: Vec<Author>,
    copyright: String,
    compiled: Option<DateTime<Local>>,
    signals: Vec<Signal>,
    on_signal: Option<SignalFn>,
    on_exit_error: Option<ExitErrorFn>,
    exit: ExitFn,
    writer: Writer,
    err_writer: Writer,
    env: Environment,
    metadata: Metadata,
    printer: Option<Arc<dyn HelpPrinter>>,
    prepared: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// An application named after `argv[0]`, writing to stdout/stderr and
    /// exiting through [`std::process::exit`].
    pub fn new() -> Self {
        Self {
            command: Command::new(""),
            version: String::new(),
            hide_version: false,
            authors: Vec::new(),
            copyright: String::new(),
            compiled: None,
            signals: Vec::new(),
            on_signal: None,
            on_exit_error: None,
            exit: Box::new(exit_process),
            writer: Writer::stdout(),
            err_writer: Writer::stderr(),
            env: Environment::default(),
            metadata: Metadata::default(),
            printer: None,
            prepared: false,
        }
    }

    fn map_command(mut self, f: impl FnOnce(Command) -> Command) -> Self {
        self.command = f(self.command);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.command.name = name.into();
        self
    }

    pub fn with_usage(self, usage: impl Into<String>) -> Self {
        self.map_command(|command| command.with_usage(usage))
    }

    pub fn with_usage_text(self, usage_text: impl Into<String>) -> Self {
        self.map_command(|command| command.with_usage_text(usage_text))
    }

    pub fn with_description(self, description: impl Into<String>) -> Self {
        self.map_command(|command| command.with_description(description))
    }

    pub fn with_args_usage(self, args_usage: impl Into<String>) -> Self {
        self.map_command(|command| command.with_args_usage(args_usage))
    }

    pub fn with_help_name(self, help_name: impl Into<String>) -> Self {
        self.map_command(|command| command.with_help_name(help_name))
    }

    pub fn without_help(self) -> Self {
        self.map_command(Command::without_help)
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Drops the `--version` flag, the `version` subcommand and the VERSION
    /// help section.
    pub fn without_version(mut self) -> Self {
        self.hide_version = true;
        self
    }

    pub fn with_author(mut self, author: Author) -> Self {
        self.authors.push(author);
        self
    }

    pub fn with_copyright(mut self, copyright: impl Into<String>) -> Self {
        self.copyright = copyright.into();
        self
    }

    pub fn with_compiled(mut self, compiled: DateTime<Local>) -> Self {
        self.compiled = Some(compiled);
        self
    }

    pub fn with_flag(self, flag: impl Flag + 'static) -> Self {
        self.map_command(|command| command.with_flag(flag))
    }

    pub fn with_command(self, command: Command) -> Self {
        self.map_command(|root| root.with_command(command))
    }

    pub fn with_provider(self, provider: impl Provider + 'static) -> Self {
        self.map_command(|command| command.with_provider(provider))
    }

    pub fn with_before_init<F>(self, hook: F) -> Self
    where
        F: Fn(&Context<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.map_command(|command| command.with_before_init(hook))
    }

    pub fn with_after_init<F>(self, hook: F) -> Self
    where
        F: Fn(&Context<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.map_command(|command| command.with_after_init(hook))
    }

    pub fn with_before<F>(self, hook: F) -> Self
    where
        F: Fn(&Context<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.map_command(|command| command.with_before(hook))
    }

    pub fn with_after<F>(self, hook: F) -> Self
    where
        F: Fn(&Context<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.map_command(|command| command.with_after(hook))
    }

    pub fn with_action<F>(self, action: F) -> Self
    where
        F: Fn(&Context<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.map_command(|command| command.with_action(action))
    }

    pub fn on_usage_error<F>(self, hook: F) -> Self
    where
        F: Fn(&Context<'_>, Error) -> Option<Error> + Send + Sync + 'static,
    {
        self.map_command(|command| command.on_usage_error(hook))
    }

    /// See [`Command::on_command_not_found`].
    pub fn on_command_not_found<F>(self, hook: F) -> Self
    where
        F: Fn(&Context<'_>, &str) + Send + Sync + 'static,
    {
        self.map_command(|command| command.on_command_not_found(hook))
    }

    pub fn with_strategy(self, strategy: impl BackOff + 'static) -> Self {
        self.map_command(|command| command.with_strategy(strategy))
    }

    /// Signals handed to [`App::on_signal`].
    pub fn with_signals(mut self, signals: impl IntoIterator<Item = Signal>) -> Self {
        self.signals.extend(signals);
        self
    }

    pub fn on_signal<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Context<'_>, Signal) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.on_signal = Some(Box::new(handler));
        self
    }

    pub fn on_exit_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(Error) -> Option<Error> + Send + Sync + 'static,
    {
        self.on_exit_error = Some(Box::new(hook));
        self
    }

    /// Replaces [`std::process::exit`]; mostly for tests.
    pub fn with_exit<F>(mut self, exit: F) -> Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.exit = Box::new(exit);
        self
    }

    pub fn with_writer(mut self, writer: impl Into<Writer>) -> Self {
        self.writer = writer.into();
        self
    }

    pub fn with_err_writer(mut self, writer: impl Into<Writer>) -> Self {
        self.err_writer = writer.into();
        self
    }

    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Shared runtime metadata visible to every context of every run.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_help_printer(mut self, printer: impl HelpPrinter + 'static) -> Self {
        self.printer = Some(Arc::new(printer));
        self
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn name(&self) -> &str {
        &self.command.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn authors(&self) -> &[Author] {
        &self.authors
    }

    /// Build time, known after the first run.
    pub fn compiled(&self) -> Option<DateTime<Local>> {
        self.compiled
    }

    /// Runs the application with a full argument vector, `argv[0]`
    /// included. On failure the error is printed to the error writer and the
    /// exit function is called; the code is also returned. Success returns
    /// 0 without calling the exit function.
    pub fn run<I, S>(&mut self, args: I) -> i32
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args: Vec<String> = args.into_iter().map(Into::into).collect();
        if args.is_empty() {
            args.push("unknown".to_string());
        }
        self.prepare(&args[0]);

        let mut invocation = Invocation::new(args.split_off(1))
            .with_writer(self.writer.clone())
            .with_err_writer(self.err_writer.clone())
            .with_env(self.env.clone())
            .with_metadata(self.metadata.clone());
        if let Some(printer) = &self.printer {
            invocation.shared.printer = printer.clone();
        }

        let this = &*self;
        let root = &this.command;
        let Invocation { args, shared } = invocation;

        let on_signal = |signal: Signal| {
            let Some(handler) = &this.on_signal else {
                return;
            };
            let ctx = Context::from_shared(root, args.clone(), shared.clone()).with_signal(signal);
            if let Err(err) = handler(&ctx, signal) {
                this.exit_with(Error::from_boxed(err));
            }
        };
        let signals: &[Signal] = if this.on_signal.is_some() {
            &this.signals
        } else {
            &[]
        };

        let outcome = signal::watch(signals, on_signal, || {
            root.execute(Context::from_shared(root, args.clone(), shared.clone()))
        });

        match outcome {
            Ok(()) => EXIT_CODE_SUCCESS,
            Err(err) => this.exit_with(err),
        }
    }

    fn prepare(&mut self, program: &str) {
        if self.prepared {
            return;
        }
        self.prepared = true;

        if self.command.name.is_empty() {
            self.command.name = Path::new(program)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| program.to_string());
        }

        if self.compiled.is_none() {
            let modified = std::fs::metadata(program).and_then(|meta| meta.modified());
            self.compiled = Some(modified.map(DateTime::from).unwrap_or_else(|_| Local::now()));
        }

        if !self.hide_version {
            self.command
                .push_flag(Box::new(BoolFlag::new("version, v").with_usage("prints the version")));
            self.command.commands.push(version_command());
        }

        let authors: Vec<serde_json::Value> = self
            .authors
            .iter()
            .map(|author| author.to_string().into())
            .collect();
        let metadata = &mut self.command.metadata;
        metadata.insert(METADATA_HIDE_VERSION.to_string(), self.hide_version.into());
        metadata.insert(METADATA_VERSION.to_string(), self.version.clone().into());
        metadata.insert(METADATA_AUTHORS.to_string(), authors.into());
        metadata.insert(METADATA_COPYRIGHT.to_string(), self.copyright.clone().into());

        self.command.prepare();
        debug!(app = %self.command.name, version = %self.version, "application prepared");
    }

    /// Passes `err` through the exit hook, prints it and calls the exit
    /// function. Returns the code, or 0 when the hook suppressed the error.
    fn exit_with(&self, err: Error) -> i32 {
        let err = match &self.on_exit_error {
            Some(hook) => match hook(err) {
                Some(err) => err,
                None => return EXIT_CODE_SUCCESS,
            },
            None => err,
        };

        let mut writer = self.err_writer.clone();
        let _ = writeln!(writer, "{err}");
        let _ = writer.flush();

        let code = match err.code() {
            EXIT_CODE_SUCCESS => EXIT_CODE_FAILURE,
            code => code,
        };
        debug!(code, error = %err, "exiting");
        (self.exit)(code);
        code
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("command", &self.command)
            .field("version", &self.version)
            .field("hide_version", &self.hide_version)
            .field("authors", &self.authors)
            .field("signals", &self.signals)
            .finish_non_exhaustive()
    }
}
