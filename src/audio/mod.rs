pub mod episode;
#[cfg(feature = "audio")]
pub mod player;
pub mod transport;

pub use episode::{load_catalog, Episode};
#[cfg(feature = "audio")]
pub use player::AudioPlayer;

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub volume: f32, // 0.0 to 1.0
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { volume: 0.7 }
    }
}

impl From<&crate::config::Config> for AudioConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            volume: config.audio.volume.clamp(0.0, 1.0),
        }
    }
}

/// Notifications a media handle sends back to whoever drives it.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    Play,
    Pause,
    MetadataLoaded { duration: Option<Duration> },
    TimeUpdate(Duration),
    Ended,
    Error(String),
}

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {0}: unsupported format or corrupted file")]
    Decode(String),

    #[error("Audio output error: {0}")]
    Output(String),

    #[error("Seek failed: {0}")]
    Seek(String),

    #[error("No source loaded")]
    NoSource,
}

/// The thing that actually decodes and plays audio.
///
/// `play` and `pause` must be idempotent: calling them in the state they
/// would produce does nothing and emits no event.
pub trait MediaHandle {
    /// Replace the current source. With `autoplay` the handle starts playing
    /// once the source is ready.
    fn load(&mut self, source: &str, autoplay: bool) -> Result<(), MediaError>;
    fn play(&mut self) -> Result<(), MediaError>;
    fn pause(&mut self) -> Result<(), MediaError>;
    fn stop(&mut self);
    fn position(&self) -> Duration;
    fn seek(&mut self, position: Duration) -> Result<(), MediaError>;
    fn set_looping(&mut self, looping: bool);
}

/// Turn an episode URL into a local path. Only plain paths and `file://` URLs are playable.
pub fn resolve_source(url: &str) -> Result<PathBuf, MediaError> {
    if let Some(path) = url.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }

    match url.split_once("://") {
        Some(_) => Err(MediaError::UnsupportedSource(url.to_string())),
        None if url.is_empty() => Err(MediaError::UnsupportedSource(url.to_string())),
        None => Ok(PathBuf::from(url)),
    }
}
