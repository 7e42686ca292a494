//! Engine settings loaded from `transition.toml`.
//!
//! The file is optional; every field has a default so a missing file or a missing
//! key falls back to the values the engine was designed around.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Default number of writes issued per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Structure of the whole `transition.toml` file
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Transition engine settings
    #[serde(default)]
    pub transition: TransitionSettings,
}

/// Tunables for a month transition
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TransitionSettings {
    /// Number of persistence writes awaited together before the next chunk starts
    pub chunk_size: usize,
    /// Whether the runner refuses to transition a dashboard twice in one month
    pub skip_if_already_transitioned: bool,
}

impl Default for TransitionSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            skip_if_already_transitioned: true,
        }
    }
}

impl TransitionSettings {
    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config {
                message: "chunk_size must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Parses settings from TOML text and validates them.
pub fn parse_settings(contents: &str) -> Result<TransitionSettings> {
    let config: Config = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse transition.toml: {e}"),
    })?;
    config.transition.validate()?;
    Ok(config.transition)
}

/// Loads settings from a TOML file, falling back to defaults when it does not exist.
///
/// # Errors
/// Returns an error if the file exists but cannot be read, is not valid TOML, or
/// holds out-of-range values.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<TransitionSettings> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!("No settings file at {:?}, using defaults", path);
        return Ok(TransitionSettings::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read settings file {}: {e}", path.display()),
    })?;
    parse_settings(&contents)
}

/// Loads settings from the default location (./transition.toml)
pub fn load_default_settings() -> Result<TransitionSettings> {
    load_settings("transition.toml")
}
