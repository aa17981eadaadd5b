// Configuration management for podbar
// Handles loading/saving settings, with sensible defaults when config is missing

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog_path: PathBuf,
    pub log_dir: PathBuf,
    pub audio: AudioSettings,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub volume: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub tick_rate_ms: u64,
    pub seek_step_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        let app_dir = Self::app_dir().unwrap_or_else(|| PathBuf::from("."));

        Self {
            catalog_path: app_dir.join("episodes.json"),
            log_dir: app_dir.join("logs"),
            audio: AudioSettings::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self { volume: 0.7 }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 250, // roughly what a browser's timeupdate does
            seek_step_seconds: 10,
        }
    }
}

impl Config {
    /// Load from the default location, writing defaults on first run.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config {}", path.display()))?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    fn app_dir() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("podbar"))
    }

    fn config_path() -> Result<PathBuf> {
        let app_dir = Self::app_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(app_dir.join("config.toml"))
    }
}
