//! Nested commands, typed flags and a layered configuration pipeline for
//! command-line applications.
//!
//! An application declares a tree of [`Command`]s, each carrying typed flags
//! ([`StringFlag`], [`IntFlag`], [`DurationFlag`], ...) and lifecycle hooks.
//! Running the tree resolves every flag through the provider chain:
//!
//! 1. [`DefaultsProvider`] snapshots declared defaults (and restores them if
//!    a later provider fails),
//! 2. [`FileProvider`] reads the files named by each flag's path globs,
//! 3. [`EnvProvider`] reads each flag's environment variables,
//! 4. [`ArgsProvider`] parses the command line,
//! 5. user providers, optionally wrapped in a [`BackOffProvider`].
//!
//! Later sources override earlier ones. The dispatcher then validates flags,
//! routes to the selected subcommand and runs its action. Failures carry
//! exit codes (see [`Error`]); [`App`] turns them into a process exit.
//!
//! # Example
//!
//! ```
//! use std::io::Write;
//! use cmdkit_core::{Buffer, Command, Environment, IntFlag, Invocation, StringFlag};
//!
//! let out = Buffer::default();
//! let mut app = Command::new("greet")
//!     .with_flag(StringFlag::new("name, n").with_value("world"))
//!     .with_flag(IntFlag::new("times").with_env_var("GREET_TIMES").with_value(1))
//!     .with_action(|ctx| {
//!         for _ in 0..ctx.int("times") {
//!             writeln!(ctx.writer(), "hello {}", ctx.string("name"))?;
//!         }
//!         Ok(())
//!     });
//!
//! let env = Environment::fixed([("GREET_TIMES", "2")]);
//! app.run(Invocation::new(["-n", "rust"]).with_writer(out.clone()).with_env(env))
//!     .unwrap();
//! assert_eq!(out.contents(), "hello rust\nhello rust\n");
//! ```

mod accessor;
mod app;
mod category;
mod codec;
mod command;
mod context;
mod dispatch;
mod error;
mod flag;
mod help;
mod io;
mod provider;
mod retry;
mod signal;
mod validate;

pub use accessor::FlagAccessor;
pub use app::{
    App, Author, ExitErrorFn, ExitFn, METADATA_AUTHORS, METADATA_COPYRIGHT,
    METADATA_HIDE_VERSION, METADATA_VERSION, SignalFn, copyright,
};
pub use category::{CommandCategory, compare_names, sort_by_name};
pub use codec::{Codec, JsonCodec};
pub use command::{Command, CommandNotFoundFn, HookFn, METADATA_VISIBLE_FLAGS, UsageErrorFn};
pub use context::{Context, Environment, Invocation, Metadata};
pub use error::{
    BoxError, EXIT_CODE_APPLICATION, EXIT_CODE_FAILURE, EXIT_CODE_FLAG_PROCESSING,
    EXIT_CODE_NOT_FOUND_COMMAND, EXIT_CODE_NOT_FOUND_FLAG, EXIT_CODE_SUCCESS, Error, ExitError,
    ExitErrorCollector, Result,
};
pub use flag::*;
pub use help::{DefaultHelpPrinter, HelpPrinter};
pub use io::{Buffer, Writer};
pub use provider::{
    ArgsProvider, BackOffProvider, DefaultsProvider, EnvProvider, FileProvider, Provider,
    Transaction,
};
pub use retry::{BackOff, ConstantBackOff, ExponentialBackOff, StopBackOff, retry_notify};
pub use signal::Signal;
pub use validate::ValidationError;
