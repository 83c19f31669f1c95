//! Built-in `help` and `version` subcommands and the plain-text help layout.
//!
//! Help output goes through a [`HelpPrinter`] so applications can swap in
//! their own layout with [`Invocation::with_help_printer`](crate::Invocation::with_help_printer).

use std::io::{self, Write};

use crate::app::{
    METADATA_AUTHORS, METADATA_COPYRIGHT, METADATA_HIDE_VERSION, METADATA_VERSION,
};
use crate::command::{Builtin, Command, METADATA_VISIBLE_FLAGS};
use crate::context::Context;
use crate::error::{BoxError, Error};

/// Renders help for one command.
pub trait HelpPrinter: Send + Sync {
    /// `root` selects the application layout (version, authors, global
    /// options, copyright) over the subcommand layout.
    fn print_help(&self, writer: &mut dyn Write, command: &Command, root: bool) -> io::Result<()>;
}

/// Sectioned plain-text help with aligned columns.
///
/// # Examples
///
/// ```
/// use cmdkit_core::{Command, DefaultHelpPrinter, HelpPrinter, StringFlag};
///
/// let mut app = Command::new("app")
///     .with_usage("does things")
///     .with_flag(StringFlag::new("config, c").with_usage("config file"))
///     .with_command(Command::new("build").with_usage("compiles"));
/// app.prepare();
///
/// let mut out = Vec::new();
/// DefaultHelpPrinter.print_help(&mut out, &app, true).unwrap();
/// let text = String::from_utf8(out).unwrap();
/// assert!(text.starts_with("NAME:\n   app - does things\n"));
/// assert!(text.contains("   build    compiles\n"));
/// assert!(text.contains("   --config value, -c value  config file\n"));
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHelpPrinter;

impl HelpPrinter for DefaultHelpPrinter {
    fn print_help(&self, w: &mut dyn Write, command: &Command, root: bool) -> io::Result<()> {
        let title = if command.usage.is_empty() {
            command.help_name.clone()
        } else {
            format!("{} - {}", command.help_name, command.usage)
        };
        section(w, "NAME", &[title])?;

        let visible_commands = command.visible_commands();
        let usage = if !command.usage_text.is_empty() {
            command.usage_text.clone()
        } else {
            usage_line(command, root, !visible_commands.is_empty())
        };
        section(w, "USAGE", &[usage])?;

        if root && !hide_version(command) {
            if let Some(version) = text_metadata(command, METADATA_VERSION) {
                section(w, "VERSION", &[version])?;
            }
        }

        if !command.description.is_empty() {
            let lines: Vec<String> = command.description.lines().map(str::to_string).collect();
            section(w, "DESCRIPTION", &lines)?;
        }

        if root {
            let authors = list_metadata(command, METADATA_AUTHORS);
            if !authors.is_empty() {
                let title = if authors.len() == 1 { "AUTHOR" } else { "AUTHORS" };
                section(w, title, &authors)?;
            }
        }

        if !visible_commands.is_empty() {
            writeln!(w, "COMMANDS:")?;
            for category in command.visible_categories() {
                let rows: Vec<(String, String)> = category
                    .visible_commands()
                    .into_iter()
                    .map(|child| (child.names().join(", "), child.usage.clone()))
                    .collect();
                if category.name.is_empty() {
                    table(w, "   ", &rows)?;
                } else {
                    writeln!(w, "   {}:", category.name)?;
                    table(w, "     ", &rows)?;
                }
            }
            writeln!(w)?;
        }

        let flags = visible_flags(command);
        if !flags.is_empty() {
            writeln!(w, "{}:", if root { "GLOBAL OPTIONS" } else { "OPTIONS" })?;
            let rows: Vec<(String, String)> = flags
                .iter()
                .map(|line| match line.split_once('\t') {
                    Some((names, usage)) => (names.to_string(), usage.to_string()),
                    None => (line.clone(), String::new()),
                })
                .collect();
            table(w, "   ", &rows)?;
            writeln!(w)?;
        }

        if root {
            if let Some(copyright) = text_metadata(command, METADATA_COPYRIGHT) {
                section(w, "COPYRIGHT", &[copyright])?;
            }
        }
        Ok(())
    }
}

fn usage_line(command: &Command, root: bool, has_commands: bool) -> String {
    let mut line = command.help_name.clone();
    if root {
        line.push_str(" [global options]");
        if has_commands {
            line.push_str(" command [command options]");
        }
    } else {
        if has_commands {
            line.push_str(" command");
        }
        line.push_str(" [command options]");
    }
    line.push(' ');
    if command.args_usage.is_empty() {
        line.push_str("[arguments...]");
    } else {
        line.push_str(&command.args_usage);
    }
    line
}

fn section(w: &mut dyn Write, title: &str, lines: &[String]) -> io::Result<()> {
    writeln!(w, "{title}:")?;
    for line in lines {
        writeln!(w, "   {line}")?;
    }
    writeln!(w)
}

/// Two columns, the first padded to its widest cell plus two spaces.
fn table(w: &mut dyn Write, indent: &str, rows: &[(String, String)]) -> io::Result<()> {
    let width = rows
        .iter()
        .map(|(left, _)| left.chars().count())
        .max()
        .unwrap_or(0);
    for (left, right) in rows {
        if right.is_empty() {
            writeln!(w, "{indent}{left}")?;
        } else {
            writeln!(w, "{indent}{left:<width$}  {right}")?;
        }
    }
    Ok(())
}

fn hide_version(command: &Command) -> bool {
    command
        .metadata
        .get(METADATA_HIDE_VERSION)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

fn text_metadata(command: &Command, key: &str) -> Option<String> {
    let text = match command.metadata.get(key)? {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Null => return None,
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

fn list_metadata(command: &Command, key: &str) -> Vec<String> {
    match command.metadata.get(key) {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Help lines recorded at preparation, or rendered now for unprepared
/// commands.
fn visible_flags(command: &Command) -> Vec<String> {
    match command.metadata.get(METADATA_VISIBLE_FLAGS) {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => command
            .visible_flags()
            .iter()
            .map(|accessor| accessor.format())
            .collect(),
    }
}

pub(crate) fn help_command() -> Command {
    Command::new("help")
        .with_alias("h")
        .with_usage("Shows a list of commands or help for one command")
        .with_args_usage("[command]")
        .without_help()
        .without_flag_parsing()
        .with_action(show_help)
        .builtin(Builtin::Help)
}

pub(crate) fn version_command() -> Command {
    Command::new("version")
        .with_alias("v")
        .with_usage("Prints the version")
        .with_args_usage("[command]")
        .mark_hidden()
        .without_help()
        .without_flag_parsing()
        .with_action(show_version)
        .builtin(Builtin::Version)
}

/// `help [command]`: help for the named sibling, or for the parent.
fn show_help(ctx: &Context<'_>) -> Result<(), BoxError> {
    let mut writer = ctx.writer();
    let printer = ctx.help_printer();

    match (ctx.args().first(), ctx.parent()) {
        (Some(name), parent) => {
            let scope = parent.map_or(ctx.command(), Context::command);
            let Some(command) = scope.find(name) else {
                writeln!(writer, "No help topic for '{name}'")?;
                return Err(Error::not_found_command(name).into());
            };
            printer.print_help(&mut writer, command, false)?;
        }
        (None, Some(parent)) => {
            printer.print_help(&mut writer, parent.command(), parent.parent().is_none())?;
        }
        (None, None) => printer.print_help(&mut writer, ctx.command(), true)?,
    }

    writer.flush()?;
    Ok(())
}

/// Prints `<root name> version <version>`.
fn show_version(ctx: &Context<'_>) -> Result<(), BoxError> {
    let root = ctx.root().command();
    let version = text_metadata(root, METADATA_VERSION).unwrap_or_default();
    let mut writer = ctx.writer();
    writeln!(writer, "{} version {}", root.name, version)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::context::Invocation;
    use crate::flag::{BoolFlag, StringFlag};
    use crate::io::Buffer;

    use super::*;

    fn root() -> Command {
        Command::new("root")
            .with_usage("root_usage")
            .with_description("first line\nsecond line")
            .with_metadata(METADATA_VERSION, "1.0")
            .with_metadata(METADATA_COPYRIGHT, "2020")
            .with_metadata(METADATA_AUTHORS, vec!["Jane <jane@example.com>"])
            .with_flag(StringFlag::new("config, c").with_usage("config file").with_value("app.cfg"))
            .with_flag(BoolFlag::new("secret").mark_hidden())
            .with_command(Command::new("action").with_usage("action_usage").with_alias("a"))
            .with_command(Command::new("deploy").with_usage("ships it").with_category("ops"))
    }

    fn render(command: &Command, root: bool) -> String {
        let mut out = Vec::new();
        DefaultHelpPrinter.print_help(&mut out, command, root).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_root_layout() {
        let mut app = root();
        app.prepare();

        let text = render(&app, true);
        assert_eq!(
            text,
            "NAME:\n   root - root_usage\n\n\
             USAGE:\n   root [global options] command [command options] [arguments...]\n\n\
             VERSION:\n   1.0\n\n\
             DESCRIPTION:\n   first line\n   second line\n\n\
             AUTHOR:\n   Jane <jane@example.com>\n\n\
             COMMANDS:\n   action, a  action_usage\n   help, h    Shows a list of commands or help for one command\n   ops:\n     deploy  ships it\n\n\
             GLOBAL OPTIONS:\n   --config value, -c value  config file (default: app.cfg)\n   --help, -h                shows help\n\n\
             COPYRIGHT:\n   2020\n\n"
        );
    }

    #[test]
    fn test_subcommand_layout() {
        let mut app = root();
        app.prepare();

        let text = render(app.find("action").unwrap(), false);
        assert!(text.starts_with("NAME:\n   root action - action_usage\n"));
        assert!(text.contains("USAGE:\n   root action [command options] [arguments...]\n"));
        assert!(text.contains("OPTIONS:\n   --help, -h  shows help\n"));
        assert!(!text.contains("VERSION"));
        assert!(!text.contains("COPYRIGHT"));
    }

    #[test]
    fn test_hidden_version_is_not_printed() {
        let mut app = root().with_metadata(METADATA_HIDE_VERSION, true);
        app.prepare();
        assert!(!render(&app, true).contains("VERSION"));
    }

    #[test]
    fn test_help_topic_for_sibling() {
        let mut app = root();
        let out = Buffer::default();
        app.run(Invocation::new(["help", "action"]).with_writer(out.clone()))
            .unwrap();
        assert!(out.contents().contains("root action - action_usage"));
    }

    #[test]
    fn test_version_command_prints_root_version() {
        let mut app = root().with_command(version_command());
        let out = Buffer::default();
        app.run(Invocation::new(["v"]).with_writer(out.clone())).unwrap();
        assert_eq!(out.contents(), "root version 1.0\n");
    }
}
