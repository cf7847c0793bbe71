//! # AI Error Types
//!
//! Failures here are configuration failures. The runtime paths (throttle
//! decisions, cache lookups) are infallible by design so the simulation
//! tick never branches on an error.

use thiserror::Error;

/// Errors from loading or validating AI balance configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AiError {
    /// Balance file could not be read from disk.
    #[error("failed to read config: {0}")]
    ConfigRead(String),

    /// Balance file is not valid TOML for the expected schema.
    #[error("failed to parse config: {0}")]
    ConfigParse(String),

    /// Balance values are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for AI configuration operations.
pub type AiResult<T> = Result<T, AiError>;
