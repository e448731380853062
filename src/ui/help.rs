//! ui::help
//!
//! On-demand help text for a command.
//!
//! Nothing in the parser prints help on its own: `-h` or `--help` is an
//! unknown token unless the host declares such an option. A host that wants
//! help output declares the option and calls [`render`] from the handler.

use super::output::format_list;
use crate::core::command::Command;
use crate::core::option::AnyOption;

/// Render usage, description, options and subcommands of `command`.
///
/// # Example
///
/// ```
/// use cmdtree::{ui::help, Command, Opt};
///
/// let cmd = Command::new("list")
///     .description("Show items")
///     .option(Opt::<bool>::builder(["-a", "--all"]).description("Include hidden items").build());
///
/// let text = help::render(&cmd);
/// assert!(text.starts_with("Usage: list [options]"));
/// assert!(text.contains("-a, --all  Include hidden items"));
/// ```
pub fn render(command: &Command) -> String {
    let mut sections = vec![usage(command)];

    if let Some(description) = command.get_description() {
        sections.push(description.to_string());
    }

    let options: Vec<(String, String)> = command
        .option_list()
        .map(|option| (option_label(option), option_notes(option)))
        .collect();
    if !options.is_empty() {
        sections.push(format!("Options:\n{}", table(&options)));
    }

    let commands: Vec<(String, String)> = command
        .subcommands()
        .iter()
        .map(|sub| {
            (
                sub.name().to_string(),
                sub.get_description().unwrap_or_default().to_string(),
            )
        })
        .collect();
    if !commands.is_empty() {
        sections.push(format!("Commands:\n{}", table(&commands)));
    }

    sections.join("\n\n")
}

fn usage(command: &Command) -> String {
    let mut usage = String::from("Usage:");
    if !command.is_root() {
        usage.push(' ');
        usage.push_str(command.name());
    }
    if command.option_list().next().is_some() {
        usage.push_str(" [options]");
    }
    if !command.subcommands().is_empty() {
        // A group cannot run without one of its subcommands
        usage.push_str(if command.handler().is_some() {
            " [command]"
        } else {
            " <command>"
        });
    }
    usage
}

fn option_label(option: &dyn AnyOption) -> String {
    let aliases = option.names().join(", ");
    if option.is_flag() {
        return aliases;
    }
    match option.value_help_name() {
        Some(name) => format!("{} <{}>", aliases, name),
        None => format!("{} <{}>", aliases, option.kind()),
    }
}

fn option_notes(option: &dyn AnyOption) -> String {
    let mut markers = Vec::new();
    if option.is_required() {
        markers.push("required");
    }
    if option.allow_multiple() {
        markers.push("multiple");
    }

    let description = option.description().unwrap_or_default();
    match (description.is_empty(), markers.is_empty()) {
        (_, true) => description.to_string(),
        (true, false) => format!("({})", markers.join(", ")),
        (false, false) => format!("{} ({})", description, markers.join(", ")),
    }
}

fn table(rows: &[(String, String)]) -> String {
    let width = rows.iter().map(|(left, _)| left.chars().count()).max().unwrap_or(0);
    let lines: Vec<String> = rows
        .iter()
        .map(|(left, right)| {
            format!("{:<width$}  {}", left, right, width = width)
                .trim_end()
                .to_string()
        })
        .collect();
    format_list(&lines, "  ")
}
