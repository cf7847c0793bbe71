//! # AI Balance Configuration
//!
//! One TOML document configures both subsystems:
//!
//! ```toml
//! [throttle]
//! enabled = true
//! target_frame_time_ms = 30
//!
//! [path_cache]
//! max_entries = 256
//! cell_size = 10.0
//! ```
//!
//! Missing keys take the shipped defaults, so a balance file only needs
//! to state its overrides.

use crate::error::{AiError, AiResult};
use crate::path_cache::PathCacheConfig;
use crate::throttle::ThrottleConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Combined balance configuration for the AI performance systems.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Update throttle balance.
    pub throttle: ThrottleConfig,
    /// Path cache balance.
    pub path_cache: PathCacheConfig,
}

impl AiConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::ConfigParse`] for malformed TOML and
    /// [`AiError::InvalidConfig`] for values out of range.
    pub fn from_toml_str(text: &str) -> AiResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|error| AiError::ConfigParse(error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::ConfigRead`] if the file cannot be read, plus
    /// everything [`Self::from_toml_str`] reports.
    pub fn from_toml_file(path: impl AsRef<Path>) -> AiResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|error| AiError::ConfigRead(format!("{}: {error}", path.as_ref().display())))?;
        Self::from_toml_str(&text)
    }

    /// Validates both sections.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::InvalidConfig`] from the first section that
    /// fails.
    pub fn validate(&self) -> AiResult<()> {
        self.throttle.validate()?;
        self.path_cache.validate()
    }
}
