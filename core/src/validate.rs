//! Structural validation of a command tree.
//!
//! Catches declarations the dispatcher would silently mis-route: empty
//! names, sibling commands sharing a name or alias, flags without a name and
//! flags sharing an alias within one command.
//!
//! # Examples
//!
//! ```
//! use cmdkit_core::{BoolFlag, Command, StringFlag, ValidationError};
//!
//! let app = Command::new("git")
//!     .with_flag(BoolFlag::new("verbose, v"))
//!     .with_command(Command::new("commit").with_alias("ci"));
//! assert!(app.validate_tree().is_empty());
//!
//! let bad = Command::new("git")
//!     .with_flag(BoolFlag::new("verbose, v"))
//!     .with_flag(StringFlag::new("version, V"))
//!     .with_command(Command::new("commit").with_alias("ci"))
//!     .with_command(Command::new("CI"));
//! assert_eq!(
//!     bad.validate_tree(),
//!     [ValidationError::DuplicateCommand("git CI".to_string())]
//! );
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::accessor::lock;
use crate::command::Command;
use crate::flag::split;

/// Problems found by [`Command::validate_tree`]. Paths are space-separated
/// command names from the root.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Command name is empty or whitespace-only.
    #[error("command name cannot be empty: {0}")]
    EmptyCommandName(String),
    /// Two sibling commands share a name or alias, ignoring case.
    #[error("duplicate command in scope: {0}")]
    DuplicateCommand(String),
    /// A flag declares no usable name.
    #[error("flag name cannot be empty in command: {0}")]
    EmptyFlagName(String),
    /// Two flags of one command share an alias.
    #[error("duplicate flag in scope: {0}")]
    DuplicateFlag(String),
}

impl Command {
    /// Walks the tree and reports every structural problem. Built-in
    /// subcommands are exempt from the duplicate check since user commands
    /// take precedence over them.
    pub fn validate_tree(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut path = Vec::new();
        validate_command(self, &mut path, &mut errors);
        errors
    }
}

fn validate_command<'a>(
    command: &'a Command,
    path: &mut Vec<&'a str>,
    errors: &mut Vec<ValidationError>,
) {
    let name = command.name.trim();
    path.push(if name.is_empty() { "<empty>" } else { name });
    let scope = path.join(" ");

    if name.is_empty() {
        errors.push(ValidationError::EmptyCommandName(scope.clone()));
    }

    validate_flags(command, &scope, errors);

    let mut seen: HashSet<String> = HashSet::new();
    for child in command.commands() {
        if child.builtin.is_some() {
            continue;
        }
        for alias in child.names() {
            let alias = alias.trim();
            if !alias.is_empty() && !seen.insert(alias.to_lowercase()) {
                errors.push(ValidationError::DuplicateCommand(format!("{scope} {alias}")));
            }
        }
    }

    for child in command.commands() {
        validate_command(child, path, errors);
    }
    path.pop();
}

fn validate_flags(command: &Command, scope: &str, errors: &mut Vec<ValidationError>) {
    let mut seen: HashSet<String> = HashSet::new();

    for slot in command.flag_slots() {
        let aliases: Vec<String> = split(lock(slot).name()).map(str::to_string).collect();

        if aliases.is_empty() {
            errors.push(ValidationError::EmptyFlagName(scope.to_string()));
            continue;
        }
        for alias in aliases {
            if !seen.insert(alias.clone()) {
                errors.push(ValidationError::DuplicateFlag(format!("{scope} -{alias}")));
            }
        }
    }
}
