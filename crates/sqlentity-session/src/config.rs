//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use sqlentity_core::{ConfigError, Error, Result};

/// Default bound on association nesting.
pub const DEFAULT_MAX_CASCADE_DEPTH: usize = 32;

/// Configuration for [`Session`](crate::Session) behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Deepest association level a create payload may nest to. The
    /// top-level item is level 0.
    pub max_cascade_depth: usize,
    /// Validate declared field constraints before each insert/update.
    pub validate: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_cascade_depth: DEFAULT_MAX_CASCADE_DEPTH,
            validate: true,
        }
    }
}

impl SessionConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the association depth bound (builder pattern).
    #[must_use]
    pub fn max_cascade_depth(mut self, depth: usize) -> Self {
        self.max_cascade_depth = depth;
        self
    }

    /// Enable or disable pre-persistence validation (builder pattern).
    #[must_use]
    pub fn validate(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    /// Parse a configuration from JSON. Missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            Error::Config(ConfigError {
                message: format!("invalid session configuration: {e}"),
                source: Some(Box::new(e)),
            })
        })
    }
}
