//! Command tree declarations.
//!
//! A [`Command`] owns its flags, subcommands, providers and lifecycle hooks.
//! Commands are declared with builder methods and run with
//! [`Command::run`]; see the dispatcher for the execution order.
//!
//! # Example
//!
//! ```
//! use std::io::Write;
//! use cmdkit_core::{Buffer, Command, Invocation, StringFlag};
//!
//! let out = Buffer::default();
//! let mut app = Command::new("app")
//!     .with_usage("does things")
//!     .with_flag(StringFlag::new("config, c").with_usage("config file"))
//!     .with_command(
//!         Command::new("build")
//!             .with_alias("b")
//!             .with_category("development")
//!             .with_action(|ctx| {
//!                 writeln!(ctx.writer(), "building {:?}", ctx.args())?;
//!                 Ok(())
//!             }),
//!     );
//!
//! app.run(Invocation::new(["B", "release"]).with_writer(out.clone())).unwrap();
//! assert_eq!(out.contents(), "building [\"release\"]\n");
//! assert_eq!(app.find("build").unwrap().help_name, "app build");
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::accessor::{FlagAccessor, FlagSlot};
use crate::category::CommandCategory;
use crate::context::{Context, Invocation};
use crate::error::{BoxError, Error, Result};
use crate::flag::{BoolFlag, Flag};
use crate::help::help_command;
use crate::provider::{ArgsProvider, DefaultsProvider, EnvProvider, FileProvider, Provider};
use crate::retry::BackOff;

/// Hook or action callback.
pub type HookFn = Box<dyn Fn(&Context<'_>) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Rewrites or suppresses (by returning `None`) a usage error.
pub type UsageErrorFn = Box<dyn Fn(&Context<'_>, Error) -> Option<Error> + Send + Sync>;

/// Notified with the unknown name when subcommand lookup fails.
pub type CommandNotFoundFn = Box<dyn Fn(&Context<'_>, &str) + Send + Sync>;

/// Metadata key holding each command's visible flags as help lines.
pub const METADATA_VISIBLE_FLAGS: &str = "VisibleFlags";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    Help,
    Version,
}

/// A node of the command tree.
pub struct Command {
    pub name: String,
    pub aliases: Vec<String>,
    /// One-line summary shown in command lists.
    pub usage: String,
    /// Replaces the generated USAGE line in help.
    pub usage_text: String,
    pub description: String,
    /// Shown after the command in the USAGE line, e.g. `[command]`.
    pub args_usage: String,
    pub category: String,
    /// Full name used in help, such as `app build`. Filled in on run.
    pub help_name: String,
    pub hidden: bool,
    /// Suppresses the built-in `help` subcommand and `--help` flag.
    pub hide_help: bool,
    /// Leaves every argument positional; no provider runs.
    pub skip_flag_parsing: bool,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub(crate) flags: Vec<FlagSlot>,
    pub(crate) commands: Vec<Command>,
    pub(crate) providers: Vec<Box<dyn Provider>>,
    pub(crate) before_init: Option<HookFn>,
    pub(crate) after_init: Option<HookFn>,
    pub(crate) before: Option<HookFn>,
    pub(crate) after: Option<HookFn>,
    pub(crate) action: Option<HookFn>,
    pub(crate) on_usage_error: Option<UsageErrorFn>,
    pub(crate) on_command_not_found: Option<CommandNotFoundFn>,
    pub(crate) strategy: Option<Arc<dyn BackOff>>,
    pub(crate) builtin: Option<Builtin>,
    prepared: bool,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            usage: String::new(),
            usage_text: String::new(),
            description: String::new(),
            args_usage: String::new(),
            category: String::new(),
            help_name: String::new(),
            hidden: false,
            hide_help: false,
            skip_flag_parsing: false,
            metadata: serde_json::Map::new(),
            flags: Vec::new(),
            commands: Vec::new(),
            providers: Vec::new(),
            before_init: None,
            after_init: None,
            before: None,
            after: None,
            action: None,
            on_usage_error: None,
            on_command_not_found: None,
            strategy: None,
            builtin: None,
            prepared: false,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    pub fn with_usage_text(mut self, usage_text: impl Into<String>) -> Self {
        self.usage_text = usage_text.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_args_usage(mut self, args_usage: impl Into<String>) -> Self {
        self.args_usage = args_usage.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_help_name(mut self, help_name: impl Into<String>) -> Self {
        self.help_name = help_name.into();
        self
    }

    pub fn mark_hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn without_help(mut self) -> Self {
        self.hide_help = true;
        self
    }

    pub fn without_flag_parsing(mut self) -> Self {
        self.skip_flag_parsing = true;
        self
    }

    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_flag(mut self, flag: impl Flag + 'static) -> Self {
        self.push_flag(Box::new(flag));
        self
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Appends a provider after the built-in chain.
    pub fn with_provider(mut self, provider: impl Provider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Runs before the providers.
    pub fn with_before_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Context<'_>) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.before_init = Some(Box::new(hook));
        self
    }

    /// Runs after the providers, even when they failed.
    pub fn with_after_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Context<'_>) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.after_init = Some(Box::new(hook));
        self
    }

    /// Runs before validation and the action (or the chosen subcommand).
    /// An error skips both.
    pub fn with_before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Context<'_>) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.before = Some(Box::new(hook));
        self
    }

    /// Runs last, even when an earlier step failed.
    pub fn with_after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Context<'_>) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.after = Some(Box::new(hook));
        self
    }

    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: Fn(&Context<'_>) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.action = Some(Box::new(action));
        self
    }

    pub fn on_usage_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Context<'_>, Error) -> Option<Error> + Send + Sync + 'static,
    {
        self.on_usage_error = Some(Box::new(hook));
        self
    }

    /// Called with the unknown name when a positional argument matches no
    /// subcommand and this command has user subcommands.
    pub fn on_command_not_found<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Context<'_>, &str) + Send + Sync + 'static,
    {
        self.on_command_not_found = Some(Box::new(hook));
        self
    }

    /// Retries hooks, providers and the action with `strategy`.
    pub fn with_strategy(mut self, strategy: impl BackOff + 'static) -> Self {
        self.strategy = Some(Arc::new(strategy));
        self
    }

    pub(crate) fn push_flag(&mut self, flag: Box<dyn Flag>) {
        self.flags.push(Mutex::new(flag));
    }

    pub(crate) fn builtin(mut self, kind: Builtin) -> Self {
        self.builtin = Some(kind);
        self
    }

    pub(crate) fn flag_slots(&self) -> &[FlagSlot] {
        &self.flags
    }

    /// Name followed by the aliases.
    pub fn names(&self) -> Vec<&str> {
        std::iter::once(self.name.as_str())
            .chain(self.aliases.iter().map(String::as_str))
            .collect()
    }

    /// Locks every flag not marked hidden.
    pub fn visible_flags(&self) -> Vec<FlagAccessor<'_>> {
        self.flags
            .iter()
            .map(FlagAccessor::new)
            .filter(|accessor| !accessor.hidden())
            .collect()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut [Command] {
        &mut self.commands
    }

    /// Subcommand whose name or alias equals `name`, ignoring case.
    pub fn find(&self, name: &str) -> Option<&Command> {
        let name = name.to_lowercase();
        self.commands.iter().find(|command| {
            command
                .names()
                .into_iter()
                .any(|alias| alias.to_lowercase() == name)
        })
    }

    pub fn visible_commands(&self) -> Vec<&Command> {
        self.commands.iter().filter(|command| !command.hidden).collect()
    }

    /// Subcommands grouped by category, in first-seen order. Categories
    /// without visible commands are left out.
    pub fn visible_categories(&self) -> Vec<CommandCategory<'_>> {
        let mut categories: Vec<CommandCategory<'_>> = Vec::new();
        for command in &self.commands {
            match categories
                .iter_mut()
                .find(|category| category.name == command.category)
            {
                Some(category) => category.commands.push(command),
                None => {
                    let mut category = CommandCategory::new(&command.category);
                    category.commands.push(command);
                    categories.push(category);
                }
            }
        }
        categories.retain(|category| !category.visible_commands().is_empty());
        categories
    }

    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    /// Whether any subcommand besides the built-in ones exists.
    pub(crate) fn has_user_commands(&self) -> bool {
        self.commands.iter().any(|command| command.builtin.is_none())
    }

    pub(crate) fn builtin_child(&self, kind: Builtin) -> Option<&Command> {
        self.commands
            .iter()
            .find(|command| command.builtin == Some(kind))
    }

    /// Prepares the tree and runs it.
    pub fn run(&mut self, invocation: Invocation) -> Result<()> {
        self.prepare();
        self.execute(Context::new(self, invocation))
    }

    /// Installs the built-in providers, help subcommand and `--help` flag,
    /// and fills in help names. Runs once per tree.
    pub fn prepare(&mut self) {
        if self.prepared {
            return;
        }
        self.prepared = true;

        let mut providers: Vec<Box<dyn Provider>> = vec![
            Box::new(DefaultsProvider::new()),
            Box::new(FileProvider),
            Box::new(EnvProvider),
            Box::new(ArgsProvider),
        ];
        providers.append(&mut self.providers);
        self.providers = providers;

        if self.help_name.is_empty() {
            self.help_name = self.name.clone();
        }

        if !self.hide_help {
            self.push_flag(Box::new(BoolFlag::new("help, h").with_usage("shows help")));
            self.commands.push(help_command());
        }

        let visible: Vec<serde_json::Value> = self
            .visible_flags()
            .iter()
            .map(|accessor| accessor.format().into())
            .collect();
        self.metadata
            .insert(METADATA_VISIBLE_FLAGS.to_string(), visible.into());

        for command in &mut self.commands {
            if command.help_name.is_empty() {
                command.help_name = format!("{} {}", self.help_name, command.name);
            }
            command.prepare();
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("help_name", &self.help_name)
            .field("category", &self.category)
            .field("hidden", &self.hidden)
            .field("flags", &self.flags.len())
            .field("commands", &self.commands)
            .field("providers", &self.providers.len())
            .field("action", &self.action.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::flag::StringFlag;

    use super::*;

    fn tree() -> Command {
        Command::new("app")
            .with_flag(StringFlag::new("secret").mark_hidden())
            .with_flag(StringFlag::new("config, c").with_usage("config file"))
            .with_command(Command::new("build").with_alias("b").with_category("dev"))
            .with_command(Command::new("lint").with_category("dev").mark_hidden())
            .with_command(Command::new("deploy").with_category("ops"))
            .with_command(Command::new("gc").with_category("internal").mark_hidden())
    }

    #[test]
    fn test_prepare_installs_help_once() {
        let mut app = tree();
        app.prepare();
        app.prepare();

        let helps = app
            .commands()
            .iter()
            .filter(|command| command.name == "help")
            .count();
        assert_eq!(helps, 1);
        assert_eq!(app.flag_slots().len(), 3);
        assert_eq!(app.providers.len(), 4);
    }

    #[test]
    fn test_prepare_sets_help_names_recursively() {
        let mut app = tree().with_command(Command::new("remote").with_command(Command::new("add")));
        app.prepare();

        assert_eq!(app.help_name, "app");
        let remote = app.find("remote").unwrap();
        assert_eq!(remote.help_name, "app remote");
        assert_eq!(remote.find("add").unwrap().help_name, "app remote add");
        assert_eq!(remote.find("help").unwrap().help_name, "app remote help");
    }

    #[test]
    fn test_prepare_records_visible_flags() {
        let mut app = tree();
        app.prepare();

        let visible = app.metadata.get(METADATA_VISIBLE_FLAGS).unwrap();
        assert_eq!(
            visible,
            &serde_json::json!(["--config value, -c value\tconfig file", "--help, -h\tshows help"])
        );
    }

    #[test]
    fn test_without_help_skips_builtins() {
        let mut app = Command::new("app").without_help();
        app.prepare();
        assert!(app.commands().is_empty());
        assert!(app.flag_slots().is_empty());
    }

    #[test]
    fn test_find_is_case_insensitive_over_aliases() {
        let app = tree();
        assert_eq!(app.find("BUILD").unwrap().name, "build");
        assert_eq!(app.find("b").unwrap().name, "build");
        assert!(app.find("ship").is_none());
        assert_eq!(app.names(), ["app"]);
    }

    #[test]
    fn test_visible_categories_group_in_first_seen_order() {
        let app = tree();
        let categories = app.visible_categories();
        let names: Vec<_> = categories.iter().map(|category| category.name).collect();
        assert_eq!(names, ["dev", "ops"]);
        assert_eq!(categories[0].visible_commands().len(), 1);
        assert_eq!(app.visible_commands().len(), 2);
    }
}
