//! Error types for oaslint operations.
//!
//! This module defines [`OaslintError`], the primary error type used throughout
//! the engine, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Errors *about the engine's inputs* (config files, plugins, presets) are
//!   fatal and use `OaslintError` directly
//! - Errors *about the documents being linted* become [`Problem`] records and
//!   never abort a run (see the `problems` module)
//! - Use `anyhow::Error` (via `OaslintError::Other`) for unexpected errors
//!
//! [`Problem`]: crate::problems::Problem

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for oaslint operations.
#[derive(Debug, Error)]
pub enum OaslintError {
    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Malformed config, missing plugin, missing assertion predicate,
    /// unknown preset, or an `extends` cycle.
    #[error("Invalid configuration: {message}")]
    ConfigError { message: String },

    /// Unrecoverable YAML/JSON syntax failure in a document.
    #[error("Failed to parse {uri} at line {line}, column {col}: {message}")]
    ParseError {
        uri: String,
        line: usize,
        col: usize,
        message: String,
    },

    /// Failed to open or fetch a source document.
    #[error("Failed to read {uri}: {message}")]
    SourceError { uri: String, message: String },

    /// Dereferenced JSON output was requested for a document with
    /// circular references.
    #[error("Circular reference through {pointer} cannot be dereferenced into plain JSON")]
    CircularJsonNotSupported { pointer: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for oaslint operations.
pub type Result<T> = std::result::Result<T, OaslintError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_not_found_displays_path() {
        let err = OaslintError::ConfigNotFound {
            path: PathBuf::from("/foo/oaslint.yaml"),
        };
        assert!(err.to_string().contains("/foo/oaslint.yaml"));
    }

    #[test]
    fn config_parse_error_displays_path_and_message() {
        let err = OaslintError::ConfigParseError {
            path: PathBuf::from("/oaslint.yaml"),
            message: "invalid syntax".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/oaslint.yaml"));
        assert!(msg.contains("invalid syntax"));
    }

    #[test]
    fn parse_error_displays_position() {
        let err = OaslintError::ParseError {
            uri: "openapi.yaml".into(),
            line: 4,
            col: 7,
            message: "mapping values are not allowed here".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("openapi.yaml"));
        assert!(msg.contains("line 4"));
        assert!(msg.contains("column 7"));
    }

    #[test]
    fn circular_json_displays_pointer() {
        let err = OaslintError::CircularJsonNotSupported {
            pointer: "#/components/schemas/Node".into(),
        };
        assert!(err.to_string().contains("#/components/schemas/Node"));
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: OaslintError = io_err.into();
        assert!(matches!(err, OaslintError::Io(_)));
    }

    #[test]
    fn result_type_alias_works() {
        fn returns_error() -> Result<()> {
            Err(OaslintError::ConfigError {
                message: "test".into(),
            })
        }
        assert!(returns_error().is_err());
    }
}
