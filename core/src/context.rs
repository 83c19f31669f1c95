//! Per-invocation state handed to hooks, actions, providers and validators.
//!
//! A [`Context`] points at the executing [`Command`], holds the positional
//! arguments left for it and links to its parent's context. Writers, the
//! [`Metadata`] bag, the [`Environment`] and the help printer are shared by
//! every context of one invocation.
//!
//! # Example
//!
//! ```
//! use std::io::Write;
//! use cmdkit_core::{Buffer, Command, Environment, Invocation, IntFlag, StringFlag};
//!
//! let out = Buffer::default();
//! let mut app = Command::new("greet")
//!     .with_flag(StringFlag::new("name, n").with_value("world"))
//!     .with_flag(IntFlag::new("times").with_env_var("TIMES"))
//!     .with_action(|ctx| {
//!         for _ in 0..ctx.int("times") {
//!             writeln!(ctx.writer(), "hello {}", ctx.string("name"))?;
//!         }
//!         Ok(())
//!     });
//!
//! let invocation = Invocation::new(["-n", "rust"])
//!     .with_writer(out.clone())
//!     .with_env(Environment::fixed([("TIMES", "2")]));
//! app.run(invocation).unwrap();
//! assert_eq!(out.contents(), "hello rust\nhello rust\n");
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Write;
use std::net::IpAddr;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use url::Url;

use crate::accessor::FlagAccessor;
use crate::command::Command;
use crate::flag::{HardwareAddr, Value, split};
use crate::help::{DefaultHelpPrinter, HelpPrinter};
use crate::io::Writer;
use crate::signal::Signal;

/// Shared, thread-safe `String -> JSON value` bag.
///
/// Clones refer to the same map.
#[derive(Debug, Clone, Default)]
pub struct Metadata(Arc<RwLock<serde_json::Map<String, serde_json::Value>>>);

impl Metadata {
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<serde_json::Value> {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Copy of the whole map.
    pub fn snapshot(&self) -> serde_json::Map<String, serde_json::Value> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Source of environment variables for the env provider.
///
/// `Process` reads the real environment; `Fixed` serves a captured map,
/// which keeps tests independent of the process environment.
#[derive(Debug, Clone, Default)]
pub enum Environment {
    #[default]
    Process,
    Fixed(Arc<HashMap<String, String>>),
}

impl Environment {
    pub fn fixed<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Fixed(Arc::new(
            vars.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        ))
    }

    /// Value of `key`, or `None` when unset or not valid Unicode.
    pub fn get(&self, key: &str) -> Option<String> {
        match self {
            Self::Process => std::env::var(key).ok(),
            Self::Fixed(vars) => vars.get(key).cloned(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct Shared {
    pub(crate) writer: Writer,
    pub(crate) err_writer: Writer,
    pub(crate) metadata: Metadata,
    pub(crate) env: Environment,
    pub(crate) printer: Arc<dyn HelpPrinter>,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            writer: Writer::stdout(),
            err_writer: Writer::stderr(),
            metadata: Metadata::default(),
            env: Environment::default(),
            printer: Arc::new(DefaultHelpPrinter),
        }
    }
}

/// Arguments and shared resources for one run of a command tree.
///
/// `args` excludes the program name.
pub struct Invocation {
    pub(crate) args: Vec<String>,
    pub(crate) shared: Shared,
}

impl Invocation {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            shared: Shared::default(),
        }
    }

    pub fn with_writer(mut self, writer: impl Into<Writer>) -> Self {
        self.shared.writer = writer.into();
        self
    }

    pub fn with_err_writer(mut self, writer: impl Into<Writer>) -> Self {
        self.shared.err_writer = writer.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.shared.metadata = metadata;
        self
    }

    pub fn with_env(mut self, env: Environment) -> Self {
        self.shared.env = env;
        self
    }

    pub fn with_help_printer(mut self, printer: impl HelpPrinter + 'static) -> Self {
        self.shared.printer = Arc::new(printer);
        self
    }
}

/// Execution state of one command in the chain.
pub struct Context<'a> {
    command: &'a Command,
    parent: Option<&'a Context<'a>>,
    args: Vec<String>,
    shared: Shared,
    signal: Option<Signal>,
}

impl<'a> Context<'a> {
    /// Root context for `command`. Mostly useful for exercising validators
    /// and hooks in isolation.
    pub fn new(command: &'a Command, invocation: Invocation) -> Self {
        Self {
            command,
            parent: None,
            args: invocation.args,
            shared: invocation.shared,
            signal: None,
        }
    }

    pub(crate) fn from_shared(command: &'a Command, args: Vec<String>, shared: Shared) -> Self {
        Self {
            command,
            parent: None,
            args,
            shared,
            signal: None,
        }
    }

    pub(crate) fn child<'b>(&'b self, command: &'b Command, args: Vec<String>) -> Context<'b> {
        Context {
            command,
            parent: Some(self),
            args,
            shared: self.shared.clone(),
            signal: self.signal,
        }
    }

    pub(crate) fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }

    pub fn command(&self) -> &'a Command {
        self.command
    }

    pub fn parent(&self) -> Option<&'a Context<'a>> {
        self.parent
    }

    pub fn root(&self) -> &Context<'a> {
        let mut current: &Context<'a> = self;
        while let Some(parent) = current.parent {
            current = parent;
        }
        current
    }

    /// Positional arguments not consumed by flag parsing.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn args_mut(&mut self) -> &mut Vec<String> {
        &mut self.args
    }

    pub fn writer(&self) -> Writer {
        self.shared.writer.clone()
    }

    pub fn err_writer(&self) -> Writer {
        self.shared.err_writer.clone()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.shared.metadata
    }

    pub fn env(&self) -> &Environment {
        &self.shared.env
    }

    pub fn help_printer(&self) -> &dyn HelpPrinter {
        self.shared.printer.as_ref()
    }

    /// Signal that triggered this context, set only inside a signal handler.
    pub fn signal(&self) -> Option<Signal> {
        self.signal
    }

    /// Locks the flag of this command matching `name`.
    pub fn flag(&self, name: &str) -> Option<FlagAccessor<'a>> {
        self.command
            .flag_slots()
            .iter()
            .map(FlagAccessor::new)
            .find(|accessor| accessor.matches(name))
    }

    /// Locks every flag of this command, in declaration order.
    pub fn flags(&self) -> Vec<FlagAccessor<'a>> {
        self.command.flag_slots().iter().map(FlagAccessor::new).collect()
    }

    /// Value of a local flag.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.flag(name).map(|accessor| accessor.value())
    }

    /// Value of a flag on the parent chain, nearest first. At the root the
    /// search starts with the root's own flags.
    pub fn global_get(&self, name: &str) -> Option<Value> {
        let mut current: &Context<'a> = match self.parent {
            Some(parent) => parent,
            None => self,
        };
        loop {
            if let Some(value) = current.get(name) {
                return Some(value);
            }
            current = current.parent?;
        }
    }

    /// Deserializes a local document flag into `T`.
    pub fn document_as<T: DeserializeOwned>(&self, name: &str) -> serde_json::Result<T> {
        serde_json::from_value(self.document(name))
    }

    /// Environment key to current value for every flag on the chain; nearer
    /// commands override their ancestors. Empty values are left out.
    pub fn env_vars(&self) -> BTreeMap<String, String> {
        let mut vars = match self.parent {
            Some(parent) => parent.env_vars(),
            None => BTreeMap::new(),
        };
        for accessor in self.flags() {
            let value = accessor.render();
            if value.is_empty() {
                continue;
            }
            for key in split(accessor.env_var()) {
                vars.insert(key.to_string(), value.clone());
            }
        }
        vars
    }

    /// Prints help for this context's command to the normal writer.
    pub fn show_help(&self) -> std::io::Result<()> {
        let mut writer = self.writer();
        self.help_printer()
            .print_help(&mut writer, self.command, self.parent.is_none())?;
        writer.flush()
    }
}

macro_rules! readers {
    ($($(#[$doc:meta])* $local:ident, $global:ident => $variant:ident: $ty:ty = $zero:expr;)*) => {
        impl Context<'_> {
            $(
                $(#[$doc])*
                pub fn $local(&self, name: &str) -> $ty {
                    match self.get(name) {
                        Some(Value::$variant(value)) => value,
                        _ => $zero,
                    }
                }

                $(#[$doc])*
                ///
                /// Searches the parent chain like [`Context::global_get`].
                pub fn $global(&self, name: &str) -> $ty {
                    match self.global_get(name) {
                        Some(Value::$variant(value)) => value,
                        _ => $zero,
                    }
                }
            )*
        }
    };
}

readers! {
    /// String value, or `""`.
    string, global_string => String: String = String::new();
    /// String sequence, or empty.
    string_slice, global_string_slice => StringSlice: Vec<String> = Vec::new();
    /// Boolean value, or `false`.
    bool, global_bool => Bool: bool = false;
    int, global_int => Int: i32 = 0;
    int64, global_int64 => Int64: i64 = 0;
    uint, global_uint => UInt: u32 = 0;
    uint64, global_uint64 => UInt64: u64 = 0;
    float32, global_float32 => Float32: f32 = 0.0;
    float64, global_float64 => Float64: f64 = 0.0;
    /// Duration value, or zero.
    duration, global_duration => Duration: chrono::Duration = chrono::Duration::zero();
    timestamp, global_timestamp => Timestamp: Option<DateTime<FixedOffset>> = None;
    url, global_url => Url: Option<Url> = None;
    ip, global_ip => Ip: Option<IpAddr> = None;
    hardware_addr, global_hardware_addr => HardwareAddr: HardwareAddr = HardwareAddr::default();
    /// Decoded document, or `Null`.
    document, global_document => Document: serde_json::Value = serde_json::Value::Null;
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("command", &self.command.name)
            .field("args", &self.args)
            .field("signal", &self.signal)
            .field("root", &self.parent.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use crate::flag::{BoolFlag, DocumentFlag, IntFlag, StringFlag, StringSliceFlag};

    use super::*;

    fn tree() -> Command {
        Command::new("app")
            .with_flag(StringFlag::new("log-level, l").with_value("info").with_env_var("LOG_LEVEL"))
            .with_flag(BoolFlag::new("debug"))
            .with_command(
                Command::new("run")
                    .with_flag(IntFlag::new("port").with_value(8080).with_env_var("PORT"))
                    .with_flag(StringSliceFlag::new("user").with_env_var("USERS")),
            )
    }

    #[test]
    fn test_local_readers_match_aliases_case_insensitively() {
        let app = tree();
        let ctx = Context::new(&app, Invocation::new(Vec::<String>::new()));
        assert_eq!(ctx.string("log-level"), "info");
        assert_eq!(ctx.string("L"), "info");
        assert_eq!(ctx.string(" log-level "), "info");
        assert!(!ctx.bool("debug"));
        assert_eq!(ctx.get("missing"), None);
    }

    #[test]
    fn test_mismatched_reader_yields_zero() {
        let app = tree();
        let ctx = Context::new(&app, Invocation::new(Vec::<String>::new()));
        assert_eq!(ctx.int("log-level"), 0);
        assert_eq!(ctx.url("log-level"), None);
        assert_eq!(ctx.duration("debug"), chrono::Duration::zero());
    }

    #[test]
    fn test_global_readers_start_at_parent() {
        let app = tree();
        let root = Context::new(&app, Invocation::new(Vec::<String>::new()));
        let run = app.find("run").unwrap();
        let child = root.child(run, Vec::new());

        assert_eq!(child.global_string("log-level"), "info");
        assert_eq!(child.global_int("port"), 0);
        assert_eq!(child.int("port"), 8080);
        // at the root the search includes the root itself
        assert_eq!(root.global_string("log-level"), "info");
        assert_eq!(child.root().command().name, "app");
    }

    #[test]
    fn test_env_vars_collects_chain() {
        let app = tree();
        let root = Context::new(&app, Invocation::new(Vec::<String>::new()));
        let run = app.find("run").unwrap();
        let child = root.child(run, Vec::new());

        let vars = child.env_vars();
        assert_eq!(vars.get("LOG_LEVEL").map(String::as_str), Some("info"));
        assert_eq!(vars.get("PORT").map(String::as_str), Some("8080"));
        assert!(!vars.contains_key("USERS"));
    }

    #[test]
    fn test_document_as_deserializes() {
        #[derive(Deserialize)]
        struct Settings {
            port: u16,
        }

        let app = Command::new("app")
            .with_flag(DocumentFlag::new("settings").with_value(json!({"port": 9000})));
        let ctx = Context::new(&app, Invocation::new(Vec::<String>::new()));
        let settings: Settings = ctx.document_as("settings").unwrap();
        assert_eq!(settings.port, 9000);
        assert!(ctx.document_as::<Settings>("missing").is_err());
    }

    #[test]
    fn test_metadata_is_shared_between_clones() {
        let metadata = Metadata::default();
        let other = metadata.clone();
        metadata.insert("answer", 42);
        assert_eq!(other.get("answer"), Some(json!(42)));
        assert!(other.contains_key("answer"));
        assert_eq!(other.remove("answer"), Some(json!(42)));
        assert!(metadata.snapshot().is_empty());
    }

    #[test]
    fn test_fixed_environment() {
        let env = Environment::fixed([("HOME", "/tmp/home")]);
        assert_eq!(env.get("HOME").as_deref(), Some("/tmp/home"));
        assert_eq!(env.get("PATH"), None);
    }
}
