//! core::config::schema
//!
//! Settings schema types.
//!
//! # Validation
//!
//! Values are validated after parsing. Failure codes must be non-zero so a
//! host can always tell a failed invocation from a successful one.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::ui::output::Verbosity;

/// Parser settings.
///
/// # Example
///
/// ```toml
/// parse_failure_code = 2
/// handler_failure_code = 1
/// report_errors = true
/// verbosity = "debug"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Status returned when the input does not resolve to a runnable command
    pub parse_failure_code: i32,

    /// Status returned when a handler reports an error
    pub handler_failure_code: i32,

    /// Whether failures are written to the reporter
    pub report_errors: bool,

    /// Reporter verbosity
    pub verbosity: Verbosity,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            parse_failure_code: 1,
            handler_failure_code: 1,
            report_errors: true,
            verbosity: Verbosity::Normal,
        }
    }
}

impl Settings {
    /// Validate the settings values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parse_failure_code == 0 {
            return Err(ConfigError::InvalidValue(
                "parse_failure_code cannot be 0".to_string(),
            ));
        }

        if self.handler_failure_code == 0 {
            return Err(ConfigError::InvalidValue(
                "handler_failure_code cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}
