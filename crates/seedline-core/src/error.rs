//! Core error types for Seedline.
//!
//! This module defines the central error type shared by the workspace crates.

use thiserror::Error;

/// Central error type for Seedline operations.
///
/// Configuration loading has its own [`ConfigError`].
#[derive(Error, Debug)]
pub enum SeedlineError {
    /// Validation errors (invalid target, malformed URL)
    #[error("validation error: {0}")]
    Validation(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `SeedlineError`.
pub type Result<T> = std::result::Result<T, SeedlineError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SeedlineError::Validation("missing host".to_string());
        assert_eq!(err.to_string(), "validation error: missing host");

        let err = ConfigError::InvalidValue {
            field: "scope_policy".to_string(),
            reason: "unknown policy".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for scope_policy: unknown policy"
        );
    }

    #[test]
    fn test_config_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ConfigError = io.into();
        assert!(matches!(err, ConfigError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: denied");
    }
}
