use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// A single playable podcast episode. Comes from the catalog, never built by the player itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub title: String,
    pub members: String,
    pub thumbnail: String,
    pub duration: u64, // seconds
    pub url: String,
}

impl Episode {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration)
    }

    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "Untitled episode"
        } else {
            &self.title
        }
    }
}

/// Load the episode catalog - a JSON array of episodes
pub fn load_catalog(path: &Path) -> Result<Vec<Episode>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read episode catalog {}", path.display()))?;
    let episodes: Vec<Episode> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse episode catalog {}", path.display()))?;

    info!("Loaded {} episodes from {}", episodes.len(), path.display());
    Ok(episodes)
}
