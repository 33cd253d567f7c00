//! Configuration
//!
//! Persistent settings for the CLI, stored as JSON under the user's config
//! directory. A missing file means defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::documents::sections::FallbackSplit;
use crate::summarizer::{OllamaSettings, SummarizerConfig};

/// Directory name under the platform config dir
const APP_DIR: &str = "gist";
const CONFIG_FILE: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config directory not found")]
    NoConfigDir,
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

impl Serialize for ConfigError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Section extraction settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SectionSettings {
    /// Beginning/ending split used when a paper has no recognizable headings
    pub fallback: FallbackSplit,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub summarizer: SummarizerConfig,
    pub ollama: OllamaSettings,
    pub sections: SectionSettings,
}

/// Default location of the config file
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join(APP_DIR).join(CONFIG_FILE))
}

impl AppConfig {
    /// Load from the default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write to the default location, returning the path written
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let split = self.sections.fallback;
        for (name, value) in [
            ("headFraction", split.head_fraction),
            ("tailStartFraction", split.tail_start_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "sections.fallback.{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }
        if self.ollama.output_reserve >= self.ollama.context_window {
            return Err(ConfigError::Invalid(format!(
                "ollama.outputReserve ({}) must be smaller than ollama.contextWindow ({})",
                self.ollama.output_reserve, self.ollama.context_window
            )));
        }
        if self.ollama.model.trim().is_empty() {
            return Err(ConfigError::Invalid("ollama.model must not be empty".to_string()));
        }
        Ok(())
    }
}
