//! core::config
//!
//! Settings schema and loading.
//!
//! # Precedence
//!
//! Settings are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. The file named by `$CMDTREE_CONFIG`, if set and present
//! 3. Values the host sets in code
//!
//! # Example
//!
//! ```
//! use cmdtree::core::config::Settings;
//!
//! let settings = Settings::from_toml_str("parse_failure_code = 2").unwrap();
//! assert_eq!(settings.parse_failure_code, 2);
//! assert_eq!(settings.handler_failure_code, 1);
//! ```

pub mod schema;

pub use schema::Settings;

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming a settings file.
pub const CONFIG_ENV: &str = "CMDTREE_CONFIG";

/// Errors from settings operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

impl Settings {
    /// Parse and validate settings from TOML text.
    ///
    /// Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate a settings file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `$CMDTREE_CONFIG`.
    ///
    /// A missing variable or file is not an error (defaults are used).
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn discover() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading settings");
                return Self::load(&path);
            }
        }

        Ok(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::output::Verbosity;
    use tempfile::TempDir;

    #[test]
    fn load_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cmdtree.toml");
        fs::write(
            &path,
            r#"
            handler_failure_code = 3
            verbosity = "quiet"
            "#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.handler_failure_code, 3);
        assert_eq!(settings.parse_failure_code, 1);
        assert_eq!(settings.verbosity, Verbosity::Quiet);
    }

    #[test]
    fn missing_file_is_read_error() {
        let temp = TempDir::new().unwrap();
        let result = Settings::load(&temp.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cmdtree.toml");
        fs::write(&path, "parse_failure_code = \"two\"").unwrap();

        match Settings::load(&path) {
            Err(ConfigError::ParseError { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn invalid_value_rejected() {
        let result = Settings::from_toml_str("parse_failure_code = 0");
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    // Single test touches the environment so parallel tests don't race on it
    #[test]
    fn discover_from_env() {
        std::env::remove_var(CONFIG_ENV);
        assert_eq!(Settings::discover().unwrap(), Settings::default());

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cmdtree.toml");
        fs::write(&path, "report_errors = false").unwrap();

        std::env::set_var(CONFIG_ENV, path.to_str().unwrap());
        let settings = Settings::discover().unwrap();
        assert!(!settings.report_errors);

        std::env::set_var(CONFIG_ENV, temp.path().join("absent.toml").to_str().unwrap());
        assert_eq!(Settings::discover().unwrap(), Settings::default());

        std::env::remove_var(CONFIG_ENV);
    }
}
