// podbar library - podcast player core plus its terminal front end
// The store and control surface build on their own; audio and tui are feature-gated

pub mod audio;   // episodes, the media handle trait, rodio playback
pub mod config;  // settings and preferences
pub mod player;  // playback store + control surface
#[cfg(all(feature = "tui", feature = "audio"))]
pub mod ui;      // terminal interface

// Export the stuff other modules actually use
pub use audio::{Episode, MediaEvent, MediaHandle};
pub use config::Config;
pub use player::{ControlSurface, ControlsView, PlaybackState, PlayerStore, UserAction};
