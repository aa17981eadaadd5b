// Playback core - the episode queue and the control bar bound to it.
// Nothing in here knows about the terminal or rodio.

pub mod store;   // queue, current index, transport flags
pub mod surface; // binds the store to a media handle, derives the control view

pub use store::{PlaybackState, PlayerStore};
pub use surface::{ButtonView, ControlSurface, ControlsView, EpisodeView, SurfaceError, UserAction};
