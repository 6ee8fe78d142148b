//! Configuration management for promptfit
//!
//! Holds the engine parameters the budget pipeline needs: context
//! window size, the fraction of it reserved for prompt content, and
//! the turn-marker token sequence emitted by the chat template.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::budget::{Budget, DEFAULT_PROMPT_PROPORTION};
use crate::segment::{BoundaryMarker, Token};

/// A precondition violation, reported at configuration time rather
/// than per request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("boundary marker must not be empty")]
    EmptyMarker,
    #[error("context window must be greater than zero")]
    ZeroContextWindow,
    #[error("prompt proportion {0} is outside (0, 1]")]
    InvalidProportion(f64),
}

/// promptfit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Context window size in tokens
    pub context_window: usize,
    /// Fraction of the window reserved for prompt content
    #[serde(default = "default_proportion")]
    pub prompt_proportion: f64,
    /// Turn-marker token sequence (engine/template specific)
    pub boundary_marker: Vec<Token>,
    /// Version of config schema (for future migrations)
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_proportion() -> f64 {
    DEFAULT_PROMPT_PROPORTION
}

fn default_version() -> u32 {
    1
}

impl Config {
    /// Validate the configured values, then build a `Config`.
    pub fn new(
        context_window: usize,
        prompt_proportion: f64,
        boundary_marker: Vec<Token>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            context_window,
            prompt_proportion,
            boundary_marker,
            version: 1,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the preconditions the croppers rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.boundary_marker.is_empty() {
            return Err(ConfigError::EmptyMarker);
        }
        if self.context_window == 0 {
            return Err(ConfigError::ZeroContextWindow);
        }
        if self.prompt_proportion <= 0.0 || self.prompt_proportion > 1.0 {
            return Err(ConfigError::InvalidProportion(self.prompt_proportion));
        }
        Ok(())
    }

    /// The token budget this configuration implies.
    pub fn budget(&self) -> Budget {
        Budget::new(self.context_window, self.prompt_proportion)
    }

    /// The validated marker sequence.
    pub fn marker(&self) -> Result<BoundaryMarker, ConfigError> {
        BoundaryMarker::new(self.boundary_marker.clone())
    }

    /// Get the config file path (~/.promptfit/config.toml)
    pub fn path() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(".promptfit").join("config.toml"))
    }

    /// Check if config exists (i.e., not first run)
    pub fn exists() -> bool {
        Self::path().map(|p| p.exists()).unwrap_or(false)
    }

    /// Load config from disk, or return None if it doesn't exist
    pub fn load() -> Result<Option<Self>> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    /// Load config from an explicit path (used by the CLI's --config flag)
    pub fn load_from(path: &std::path::Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate().context("Invalid values in config file")?;
        Ok(Some(config))
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, content).context("Failed to write config file")?;

        Ok(())
    }
}
