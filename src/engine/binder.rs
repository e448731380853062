//! engine::binder
//!
//! Validates a declared command tree and compiles its lookup tables.
//!
//! # Validation
//!
//! Binding walks the whole tree once and rejects declarations that could
//! never parse predictably:
//!
//! - an option without aliases, or an alias that is empty, contains
//!   whitespace, or contains the inline separators `:` or `=`
//! - an alias used twice within one command
//! - a subcommand with an empty or whitespace-containing name, or two
//!   siblings with the same name
//! - a leaf command without a handler, or a command with two handlers
//! - a required option that also declares a default
//! - `allow_multiple` on a built-in option whose type is not a list
//!
//! After binding succeeds the tree shape is frozen: the matcher only reads
//! the compiled [`BoundNode`] tables.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::core::command::Command;
use crate::core::option::AnyOption;

/// Errors from binding a command tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("an option of command '{command}' has no aliases")]
    EmptyAliases { command: String },

    #[error("invalid alias '{alias}' in command '{command}'")]
    InvalidAlias { command: String, alias: String },

    #[error("alias '{alias}' is declared twice in command '{command}'")]
    DuplicateAlias { command: String, alias: String },

    #[error("a subcommand of '{parent}' has an empty name")]
    EmptyCommandName { parent: String },

    #[error("invalid command name '{name}' under '{parent}'")]
    InvalidCommandName { parent: String, name: String },

    #[error("subcommand '{name}' is declared twice under '{parent}'")]
    DuplicateSubcommand { parent: String, name: String },

    #[error("command '{command}' has neither a handler nor subcommands")]
    MissingHandler { command: String },

    #[error("command '{command}' has more than one handler")]
    ConflictingHandlers { command: String },

    #[error("option '{option}' of command '{command}' is required and has a default")]
    RequiredWithDefault { command: String, option: String },

    #[error(
        "option '{option}' of command '{command}' allows multiple values but its type {kind} is not a list"
    )]
    MultipleScalar {
        command: String,
        option: String,
        kind: String,
    },
}

/// Compiled lookup tables for one command.
#[derive(Debug)]
pub struct BoundNode {
    command: Arc<Command>,
    path: Vec<String>,
    aliases: HashMap<String, usize>,
    children: HashMap<String, BoundNode>,
}

impl BoundNode {
    pub fn command(&self) -> &Arc<Command> {
        &self.command
    }

    /// Subcommand names from the root down to this node.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn child(&self, name: &str) -> Option<&BoundNode> {
        self.children.get(name)
    }

    /// Index into the command's options for `alias`.
    pub(crate) fn option_index(&self, alias: &str) -> Option<usize> {
        self.aliases.get(alias).copied()
    }
}

/// A validated command tree.
#[derive(Debug)]
pub struct BoundRoot {
    table: BoundNode,
}

impl BoundRoot {
    pub fn command(&self) -> &Arc<Command> {
        &self.table.command
    }

    pub fn table(&self) -> &BoundNode {
        &self.table
    }
}

/// Validate `root` and compile it.
pub fn bind(root: Command) -> Result<BoundRoot, DeclarationError> {
    let table = bind_node(Arc::new(root), Vec::new())?;
    tracing::debug!(commands = count(&table), "command tree bound");
    Ok(BoundRoot { table })
}

fn count(node: &BoundNode) -> usize {
    1 + node.children.values().map(count).sum::<usize>()
}

pub(crate) fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(" ")
    }
}

fn valid_alias(alias: &str) -> bool {
    !alias.is_empty() && !alias.chars().any(|c| c.is_whitespace() || c == ':' || c == '=')
}

fn bind_node(command: Arc<Command>, path: Vec<String>) -> Result<BoundNode, DeclarationError> {
    let name = display_path(&path);

    if command.has_conflicting_handlers() {
        return Err(DeclarationError::ConflictingHandlers { command: name });
    }
    if command.handler().is_none() && command.subcommands().is_empty() {
        return Err(DeclarationError::MissingHandler { command: name });
    }

    let mut aliases = HashMap::new();
    for (idx, option) in command.option_list().enumerate() {
        check_option(&name, option)?;
        for alias in option.names() {
            if aliases.insert(alias.clone(), idx).is_some() {
                return Err(DeclarationError::DuplicateAlias {
                    command: name,
                    alias: alias.clone(),
                });
            }
        }
    }

    let mut children = HashMap::new();
    for child in command.subcommands() {
        let child_name = child.name();
        if child_name.trim().is_empty() {
            return Err(DeclarationError::EmptyCommandName { parent: name });
        }
        if child_name.chars().any(char::is_whitespace) {
            return Err(DeclarationError::InvalidCommandName {
                parent: name,
                name: child_name.to_string(),
            });
        }
        if children.contains_key(child_name) {
            return Err(DeclarationError::DuplicateSubcommand {
                parent: name,
                name: child_name.to_string(),
            });
        }

        let mut child_path = path.clone();
        child_path.push(child_name.to_string());
        let node = bind_node(Arc::clone(child), child_path)?;
        children.insert(child_name.to_string(), node);
    }

    Ok(BoundNode {
        command,
        path,
        aliases,
        children,
    })
}

fn check_option(command: &str, option: &dyn AnyOption) -> Result<(), DeclarationError> {
    if option.names().is_empty() {
        return Err(DeclarationError::EmptyAliases {
            command: command.to_string(),
        });
    }
    if let Some(alias) = option.names().iter().find(|alias| !valid_alias(alias)) {
        return Err(DeclarationError::InvalidAlias {
            command: command.to_string(),
            alias: alias.clone(),
        });
    }
    if option.is_required() && option.has_default() {
        return Err(DeclarationError::RequiredWithDefault {
            command: command.to_string(),
            option: option.primary_name().to_string(),
        });
    }
    if option.allow_multiple() && !option.is_custom() && !option.kind().is_list() {
        return Err(DeclarationError::MultipleScalar {
            command: command.to_string(),
            option: option.primary_name().to_string(),
            kind: option.kind().to_string(),
        });
    }
    Ok(())
}
