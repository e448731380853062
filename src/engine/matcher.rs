//! engine::matcher
//!
//! Resolves tokens against a bound command tree.
//!
//! # Phases
//!
//! ```text
//! Descend -> Collect -> Validate -> Stage
//! ```
//!
//! 1. **Descend**: leading tokens equal to a child name select that child.
//!    Descent is greedy and never backtracks.
//! 2. **Collect**: remaining tokens are assigned to options. For each token
//!    the first matching rule wins:
//!    1. an exact alias starts a new occurrence
//!    2. `alias:value` or `alias=value`, split at the first separator
//!    3. `-xvalue` where `-x` is a two-character alias
//!    4. the value of the preceding alias that still expects one
//!    5. a `true`/`false` literal right after a bare flag
//!    6. one more value for the preceding multi-value option, unless the
//!       token is shaped like an option (`-x`, `--name`, `/Name`)
//!    7. anything else is an unknown token
//! 3. **Validate**: the command must have a handler and every required
//!    option must have occurred.
//! 4. **Stage**: every option converts its tokens or falls back to its
//!    default. Nothing is written until the caller commits the result.
//!
//! # Invariants
//!
//! - A failed resolution leaves every option value untouched
//! - Options of a single-value type keep only their last occurrence

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::binder::{display_path, BoundNode, BoundRoot};
use super::tokenizer::TokenizeError;
use crate::core::command::{Command, Handler};
use crate::core::option::{AnyOption, BoxError, OptionSlot, StageError, Staged};
use crate::core::types::ConversionError;

/// Errors from resolving an invocation.
///
/// Every variant means the handler did not run and no option value changed.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),

    #[error("unrecognized token '{token}' for command '{command}'")]
    UnknownToken { command: String, token: String },

    #[error("option '{option}' of command '{command}' expects a value")]
    MissingValue { command: String, option: String },

    #[error("required option '{option}' of command '{command}' was not given")]
    MissingRequired { command: String, option: String },

    #[error("invalid value for option '{option}' of command '{command}': {source}")]
    InvalidValue {
        command: String,
        option: String,
        #[source]
        source: ConversionError,
    },

    #[error("option '{option}' of command '{command}' could not be parsed: {source}")]
    CustomParser {
        command: String,
        option: String,
        #[source]
        source: BoxError,
    },

    #[error("command '{command}' has no handler")]
    NoHandler { command: String },

    #[error(
        "command '{command}' is asynchronous and cannot run synchronously inside an async runtime"
    )]
    AsyncInSyncContext { command: String },
}

impl ParseError {
    /// Check if a custom parser rejected its tokens.
    pub fn is_custom_parser(&self) -> bool {
        matches!(self, ParseError::CustomParser { .. })
    }

    /// The error returned by a custom parser, for downcasting.
    pub fn custom_parser_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            ParseError::CustomParser { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// A resolved invocation whose values are staged but not yet committed.
pub struct Invocation {
    command: Arc<Command>,
    path: Vec<String>,
    handler: Handler,
    staged: Vec<Staged>,
}

impl Invocation {
    /// The resolved command.
    pub fn command(&self) -> &Arc<Command> {
        &self.command
    }

    /// Subcommand names from the root to the resolved command.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn is_async(&self) -> bool {
        self.handler.is_async()
    }

    /// Write every staged value into its option.
    pub(crate) fn commit(self) -> Arc<Command> {
        for (slot, staged) in self.command.option_slots().iter().zip(self.staged) {
            slot.commit(staged);
        }
        self.command
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("path", &self.path)
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

/// What the next token may complete.
#[derive(Debug, Clone)]
enum Pending {
    None,
    /// An alias that must be followed by a value.
    Value(usize, String),
    /// A bare flag that may take a bool literal.
    OptionalFlag(usize),
    /// A multi-value option absorbing further tokens.
    Multiple(usize),
}

/// Check if an unmatched token is shaped like an alias.
///
/// Negative numbers (`-5`, `-.5`) are values, not options.
fn looks_like_option(token: &str) -> bool {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some('-'), Some(next)) => !(next.is_ascii_digit() || next == '.'),
        (Some('/'), Some(_)) => true,
        _ => false,
    }
}

struct Collector<'a> {
    node: &'a BoundNode,
    name: String,
    occurrences: Vec<Option<Vec<String>>>,
    pending: Pending,
}

impl<'a> Collector<'a> {
    fn new(node: &'a BoundNode) -> Self {
        Self {
            node,
            name: display_path(node.path()),
            occurrences: vec![None; node.command().option_slots().len()],
            pending: Pending::None,
        }
    }

    fn allows_multiple(&self, idx: usize) -> bool {
        self.node.command().option_slots()[idx].allow_multiple()
    }

    fn missing_value(&self) -> Result<(), ParseError> {
        match &self.pending {
            Pending::Value(_, alias) => Err(ParseError::MissingValue {
                command: self.name.clone(),
                option: alias.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Start a new occurrence. Single-value options drop earlier tokens.
    fn occur(&mut self, idx: usize) -> Result<(), ParseError> {
        self.missing_value()?;
        if self.allows_multiple(idx) {
            self.occurrences[idx].get_or_insert_with(Vec::new);
        } else {
            self.occurrences[idx] = Some(Vec::new());
        }
        Ok(())
    }

    fn push_value(&mut self, idx: usize, value: &str) {
        self.occurrences[idx].get_or_insert_with(Vec::new).push(value.to_string());
        self.pending = if self.allows_multiple(idx) {
            Pending::Multiple(idx)
        } else {
            Pending::None
        };
    }

    fn split_inline<'t>(&self, token: &'t str) -> Option<(usize, &'t str)> {
        if let Some(pos) = token.find(|c: char| c == ':' || c == '=') {
            if let Some(idx) = self.node.option_index(&token[..pos]) {
                return Some((idx, &token[pos + 1..]));
            }
        }

        let (split, _) = token.char_indices().nth(2)?;
        let (alias, value) = token.split_at(split);
        if !alias.starts_with('-') {
            return None;
        }
        self.node.option_index(alias).map(|idx| (idx, value))
    }

    fn accept(&mut self, token: &str) -> Result<(), ParseError> {
        if let Some(idx) = self.node.option_index(token) {
            self.occur(idx)?;
            tracing::debug!(command = %self.name, option = token, "option occurrence");
            self.pending = if self.node.command().option_slots()[idx].is_flag() {
                Pending::OptionalFlag(idx)
            } else {
                Pending::Value(idx, token.to_string())
            };
            return Ok(());
        }

        if let Some((idx, value)) = self.split_inline(token) {
            self.occur(idx)?;
            tracing::debug!(command = %self.name, token, "option occurrence with inline value");
            self.push_value(idx, value);
            return Ok(());
        }

        match self.pending.clone() {
            Pending::Value(idx, _) => {
                self.push_value(idx, token);
                Ok(())
            }
            Pending::Multiple(idx) if !looks_like_option(token) => {
                self.push_value(idx, token);
                Ok(())
            }
            Pending::OptionalFlag(idx)
                if self.node.command().option_slots()[idx].accepts_token(token) =>
            {
                self.push_value(idx, token);
                Ok(())
            }
            _ => Err(ParseError::UnknownToken {
                command: self.name.clone(),
                token: token.to_string(),
            }),
        }
    }

    fn finish(self) -> Result<Vec<Option<Vec<String>>>, ParseError> {
        self.missing_value()?;
        Ok(self.occurrences)
    }
}

/// Resolve `tokens` against `root` without committing anything.
pub fn resolve(root: &BoundRoot, tokens: &[String]) -> Result<Invocation, ParseError> {
    let mut node = root.table();
    let mut rest = tokens;
    while let Some((first, tail)) = rest.split_first() {
        match node.child(first) {
            Some(child) => {
                node = child;
                rest = tail;
            }
            None => break,
        }
    }
    tracing::debug!(
        command = %display_path(node.path()),
        remaining = rest.len(),
        "command selected"
    );

    let mut collector = Collector::new(node);
    for token in rest {
        collector.accept(token)?;
    }
    let name = collector.name.clone();
    let occurrences = collector.finish()?;

    let command = node.command();
    let handler = command
        .handler()
        .cloned()
        .ok_or_else(|| ParseError::NoHandler { command: name.clone() })?;

    let slots = command.option_slots();
    if let Some(slot) = slots
        .iter()
        .zip(&occurrences)
        .find_map(|(slot, occurrence)| (slot.is_required() && occurrence.is_none()).then_some(slot))
    {
        return Err(ParseError::MissingRequired {
            command: name,
            option: slot.primary_name().to_string(),
        });
    }

    let mut staged = Vec::with_capacity(slots.len());
    for (slot, occurrence) in slots.iter().zip(&occurrences) {
        let value = slot.stage(occurrence.as_deref()).map_err(|err| match err {
            StageError::Conversion(source) => ParseError::InvalidValue {
                command: name.clone(),
                option: slot.primary_name().to_string(),
                source,
            },
            StageError::Custom(source) => ParseError::CustomParser {
                command: name.clone(),
                option: slot.primary_name().to_string(),
                source,
            },
        })?;
        staged.push(value);
    }

    tracing::debug!(command = %name, "invocation resolved");
    Ok(Invocation {
        command: Arc::clone(command),
        path: node.path().to_vec(),
        handler,
        staged,
    })
}
