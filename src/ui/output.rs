//! ui::output
//!
//! Diagnostics written on behalf of the parser.
//!
//! # Design
//!
//! The parser never prints directly. Failures are formatted once and passed
//! to a [`Reporter`], which forwards them to a write callback (stderr by
//! default) according to its [`Verbosity`]. Hosts that own the console
//! install their own callback with [`Reporter::new`].

use std::fmt::{self, Display};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Quiet mode - errors only
    Quiet,
    /// Normal mode - errors and warnings
    #[default]
    Normal,
    /// Debug mode - also resolution traces
    Debug,
}

type Sink = Arc<dyn Fn(&str) + Send + Sync>;

/// Verbosity-aware write callback.
#[derive(Clone)]
pub struct Reporter {
    verbosity: Verbosity,
    sink: Sink,
}

impl Reporter {
    /// Report through `sink`.
    pub fn new<F>(verbosity: Verbosity, sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            verbosity,
            sink: Arc::new(sink),
        }
    }

    /// Report to standard error.
    pub fn stderr(verbosity: Verbosity) -> Self {
        Self::new(verbosity, |line| eprintln!("{}", line))
    }

    /// Discard everything.
    pub fn silent() -> Self {
        Self::new(Verbosity::Quiet, |_| {})
    }

    /// Same sink, different verbosity.
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Report an error message (always shown).
    pub fn error(&self, message: impl Display) {
        (self.sink)(&format!("error: {}", message));
    }

    /// Report a warning message (respects quiet mode).
    pub fn warn(&self, message: impl Display) {
        if self.verbosity != Verbosity::Quiet {
            (self.sink)(&format!("warning: {}", message));
        }
    }

    /// Report a debug message (only in debug mode).
    pub fn debug(&self, message: impl Display) {
        if self.verbosity == Verbosity::Debug {
            (self.sink)(&format!("[debug] {}", message));
        }
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::stderr(Verbosity::Normal)
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("verbosity", &self.verbosity)
            .finish_non_exhaustive()
    }
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}
