//! Grouping and ordering of subcommands for help output.

use std::cmp::Ordering;

use crate::command::Command;

/// Subcommands sharing a category name. The empty name is the default
/// group.
#[derive(Debug, Clone)]
pub struct CommandCategory<'a> {
    pub name: &'a str,
    pub commands: Vec<&'a Command>,
}

impl<'a> CommandCategory<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            commands: Vec::new(),
        }
    }

    pub fn visible_commands(&self) -> Vec<&'a Command> {
        self.commands
            .iter()
            .copied()
            .filter(|command| !command.hidden)
            .collect()
    }
}

/// Case-insensitive ordering; names that differ only in case sort by the
/// raw characters.
///
/// # Examples
///
/// ```
/// use std::cmp::Ordering;
/// use cmdkit_core::compare_names;
///
/// assert_eq!(compare_names("apple", "Banana"), Ordering::Less);
/// assert_eq!(compare_names("Build", "build"), Ordering::Less);
/// assert_eq!(compare_names("run", "run-all"), Ordering::Less);
/// ```
pub fn compare_names(left: &str, right: &str) -> Ordering {
    for (l, r) in left.chars().zip(right.chars()) {
        let (lower_l, lower_r) = (lower(l), lower(r));
        if lower_l != lower_r {
            return lower_l.cmp(&lower_r);
        }
        if l != r {
            return l.cmp(&r);
        }
    }
    left.cmp(right)
}

fn lower(c: char) -> char {
    let mut lowered = c.to_lowercase();
    match (lowered.next(), lowered.next()) {
        (Some(single), None) => single,
        _ => c,
    }
}

/// Sorts commands by name with [`compare_names`].
pub fn sort_by_name(commands: &mut [Command]) {
    commands.sort_by(|left, right| compare_names(&left.name, &right.name));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_commands_skips_hidden() {
        let commands = [
            Command::new("cmd1"),
            Command::new("cmd2").mark_hidden(),
            Command::new("cmd3"),
        ];
        let mut category = CommandCategory::new("main");
        category.commands.extend(commands.iter());

        let names: Vec<_> = category
            .visible_commands()
            .iter()
            .map(|command| command.name.as_str())
            .collect();
        assert_eq!(names, ["cmd1", "cmd3"]);
    }

    #[test]
    fn test_sort_by_name() {
        let mut commands = vec![
            Command::new("deploy"),
            Command::new("Build"),
            Command::new("build"),
            Command::new("apply"),
        ];
        sort_by_name(&mut commands);
        let names: Vec<_> = commands.iter().map(|command| command.name.as_str()).collect();
        assert_eq!(names, ["apply", "Build", "build", "deploy"]);
    }

    #[test]
    fn test_compare_names_prefix() {
        assert_eq!(compare_names("run", "run"), Ordering::Equal);
        assert_eq!(compare_names("run-all", "run"), Ordering::Greater);
        assert_eq!(compare_names("a", "B"), Ordering::Less);
    }
}
