use super::store::PlayerStore;
use crate::audio::{MediaError, MediaEvent, MediaHandle};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("No media handle mounted")]
    NotMounted,

    #[error(transparent)]
    Media(#[from] MediaError),
}

/// What the user asked the control bar to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    TogglePlay,
    Next,
    Previous,
    ToggleShuffle,
    ToggleLoop,
    SeekForward,
    SeekBackward,
    SeekTo(u64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonView {
    pub enabled: bool,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeView {
    pub title: String,
    pub members: String,
    pub thumbnail: String,
    pub duration: u64,
}

/// Everything the renderer needs for one frame of the control bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlsView {
    pub episode: Option<EpisodeView>,
    pub progress: u64,
    pub duration: u64,
    pub seek_enabled: bool,
    pub shuffle: ButtonView,
    pub previous: ButtonView,
    /// `active` means playing, i.e. the button shows "pause".
    pub play_pause: ButtonView,
    pub next: ButtonView,
    pub looping: ButtonView,
}

impl ControlsView {
    pub fn any_enabled(&self) -> bool {
        self.seek_enabled
            || [self.shuffle, self.previous, self.play_pause, self.next, self.looping]
                .iter()
                .any(|button| button.enabled)
    }
}

/// Binds the store to one media handle and keeps the local progress value.
pub struct ControlSurface<H: MediaHandle> {
    handle: Option<H>,
    progress: u64,
    sampling: bool,
    loaded_source: Option<String>,
    last_is_playing: bool,
    last_is_looping: Option<bool>,
    seek_step: u64,
}

impl<H: MediaHandle> ControlSurface<H> {
    pub fn new(seek_step: u64) -> Self {
        Self {
            handle: None,
            progress: 0,
            sampling: false,
            loaded_source: None,
            last_is_playing: false,
            last_is_looping: None,
            seek_step,
        }
    }

    /// Attach a handle. The next `sync` loads the current episode into it.
    pub fn mount(&mut self, handle: H) {
        self.handle = Some(handle);
        self.loaded_source = None;
        self.last_is_looping = None;
        self.sampling = false;
    }

    pub fn unmount(&mut self) -> Option<H> {
        let mut handle = self.handle.take()?;
        handle.stop();
        self.loaded_source = None;
        self.sampling = false;
        Some(handle)
    }

    pub fn handle(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    pub fn handle_mut(&mut self) -> Option<&mut H> {
        self.handle.as_mut()
    }

    pub fn progress(&self) -> u64 {
        self.progress
    }

    /// Push store changes into the handle. Call after every store mutation.
    pub fn sync(&mut self, store: &PlayerStore) {
        let current_source = store.current_episode().map(|episode| episode.url.clone());
        let episode_changed = current_source != self.loaded_source;

        if episode_changed {
            self.progress = 0;
            self.sampling = false;
        }

        let Some(handle) = self.handle.as_mut() else {
            self.last_is_playing = store.is_playing();
            return;
        };

        if self.last_is_looping != Some(store.is_looping()) {
            handle.set_looping(store.is_looping());
            self.last_is_looping = Some(store.is_looping());
        }

        if episode_changed {
            self.loaded_source = current_source.clone();
            match current_source {
                Some(source) => {
                    info!("Loading episode source {}", source);
                    if let Err(e) = handle.load(&source, true) {
                        warn!("Failed to load {}: {}", source, e);
                    }
                }
                None => {
                    debug!("No current episode, stopping playback");
                    handle.stop();
                }
            }
        }

        if store.is_playing() != self.last_is_playing {
            self.last_is_playing = store.is_playing();
            if self.loaded_source.is_some() {
                let result = if store.is_playing() {
                    handle.play()
                } else {
                    handle.pause()
                };
                if let Err(e) = result {
                    warn!("Failed to apply is_playing = {}: {}", store.is_playing(), e);
                }
            }
        }
    }

    /// Sync only when the store has changed since `changes` was last marked seen.
    pub fn sync_if_changed(&mut self, store: &PlayerStore, changes: &mut watch::Receiver<u64>) -> bool {
        if !changes.has_changed().unwrap_or(false) {
            return false;
        }
        changes.borrow_and_update();
        self.sync(store);
        true
    }

    /// React to a notification from the media handle.
    pub fn handle_media_event(&mut self, event: MediaEvent, store: &mut PlayerStore) {
        match event {
            MediaEvent::Play => store.set_is_playing_state(true),
            MediaEvent::Pause => store.set_is_playing_state(false),
            MediaEvent::MetadataLoaded { duration } => {
                debug!("Metadata loaded, duration {:?}", duration);
                self.progress = 0;
                if let Some(handle) = self.handle.as_mut() {
                    if let Err(e) = handle.seek(Duration::ZERO) {
                        debug!("Rewind after load failed: {}", e);
                    }
                }
                self.sampling = true;
            }
            MediaEvent::TimeUpdate(position) => {
                if self.sampling {
                    self.progress = position.as_secs();
                }
            }
            MediaEvent::Ended => {
                debug!("Episode ended");
                store.set_is_playing_state(false);
            }
            MediaEvent::Error(message) => {
                warn!("Media error: {}", message);
                store.set_is_playing_state(false);
            }
        }
    }

    /// Move the playhead. Clamped to the episode length; progress follows immediately.
    pub fn seek(&mut self, seconds: u64, store: &PlayerStore) -> Result<(), SurfaceError> {
        let handle = self.handle.as_mut().ok_or(SurfaceError::NotMounted)?;
        let duration = store.current_episode().map(|episode| episode.duration).unwrap_or(0);
        let target = seconds.min(duration);

        handle.seek(Duration::from_secs(target))?;
        self.progress = target;
        Ok(())
    }

    /// Apply a user action if its control is enabled, then sync the handle.
    pub fn dispatch(&mut self, action: UserAction, store: &mut PlayerStore) -> Result<(), SurfaceError> {
        let view = self.view(store);

        let enabled = match action {
            UserAction::TogglePlay => view.play_pause.enabled,
            UserAction::Next => view.next.enabled,
            UserAction::Previous => view.previous.enabled,
            UserAction::ToggleShuffle => view.shuffle.enabled,
            UserAction::ToggleLoop => view.looping.enabled,
            UserAction::SeekForward | UserAction::SeekBackward | UserAction::SeekTo(_) => view.seek_enabled,
        };
        if !enabled {
            trace!("Ignoring {:?}, control disabled", action);
            return Ok(());
        }

        match action {
            UserAction::TogglePlay => store.toggle_play(),
            UserAction::Next => store.play_next(),
            UserAction::Previous => store.play_previous(),
            UserAction::ToggleShuffle => store.toggle_shuffle(),
            UserAction::ToggleLoop => store.toggle_loop(),
            UserAction::SeekForward => self.seek(self.progress.saturating_add(self.seek_step), store)?,
            UserAction::SeekBackward => self.seek(self.progress.saturating_sub(self.seek_step), store)?,
            UserAction::SeekTo(seconds) => self.seek(seconds, store)?,
        }

        self.sync(store);
        Ok(())
    }

    pub fn view(&self, store: &PlayerStore) -> ControlsView {
        let episode = store.current_episode().map(|episode| EpisodeView {
            title: episode.display_title().to_string(),
            members: episode.members.clone(),
            thumbnail: episode.thumbnail.clone(),
            duration: episode.duration,
        });
        let has_episode = episode.is_some();

        ControlsView {
            duration: episode.as_ref().map(|e| e.duration).unwrap_or(0),
            episode,
            progress: self.progress,
            seek_enabled: has_episode,
            shuffle: ButtonView {
                enabled: has_episode && store.queue().len() != 1,
                active: store.is_shuffling(),
            },
            previous: ButtonView {
                enabled: has_episode,
                active: false,
            },
            play_pause: ButtonView {
                enabled: has_episode,
                active: store.is_playing(),
            },
            next: ButtonView {
                enabled: has_episode,
                active: false,
            },
            looping: ButtonView {
                enabled: has_episode,
                active: store.is_looping(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::store::tests::episode;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, PartialEq)]
    enum Command {
        Load(String),
        Play,
        Pause,
        Stop,
        Seek(Duration),
        SetLooping(bool),
    }

    /// Records commands and queues the events a real handle would send.
    #[derive(Default)]
    struct FakeHandle {
        commands: Vec<Command>,
        events: VecDeque<MediaEvent>,
        loaded: bool,
        playing: bool,
        position: Duration,
        fail_loads: bool,
    }

    impl MediaHandle for FakeHandle {
        fn load(&mut self, source: &str, autoplay: bool) -> Result<(), MediaError> {
            self.commands.push(Command::Load(source.to_string()));
            self.loaded = false;
            if self.fail_loads {
                self.events.push_back(MediaEvent::Error("boom".to_string()));
                return Err(MediaError::Decode(source.to_string()));
            }
            self.loaded = true;
            self.playing = false;
            self.events.push_back(MediaEvent::MetadataLoaded {
                duration: Some(Duration::from_secs(1800)),
            });
            if autoplay {
                self.play()?;
            }
            Ok(())
        }

        fn play(&mut self) -> Result<(), MediaError> {
            self.commands.push(Command::Play);
            if !self.loaded {
                return Err(MediaError::NoSource);
            }
            if !self.playing {
                self.playing = true;
                self.events.push_back(MediaEvent::Play);
            }
            Ok(())
        }

        fn pause(&mut self) -> Result<(), MediaError> {
            self.commands.push(Command::Pause);
            if self.playing {
                self.playing = false;
                self.events.push_back(MediaEvent::Pause);
            }
            Ok(())
        }

        fn stop(&mut self) {
            self.commands.push(Command::Stop);
            self.loaded = false;
            self.playing = false;
        }

        fn position(&self) -> Duration {
            self.position
        }

        fn seek(&mut self, position: Duration) -> Result<(), MediaError> {
            self.commands.push(Command::Seek(position));
            self.position = position;
            Ok(())
        }

        fn set_looping(&mut self, looping: bool) {
            self.commands.push(Command::SetLooping(looping));
        }
    }

    fn mounted() -> ControlSurface<FakeHandle> {
        let mut surface = ControlSurface::new(10);
        surface.mount(FakeHandle::default());
        surface
    }

    /// Feed queued handle events back in until things settle, like the app loop does.
    fn pump(surface: &mut ControlSurface<FakeHandle>, store: &mut PlayerStore) {
        surface.sync(store);
        loop {
            let next = surface.handle_mut().and_then(|handle| handle.events.pop_front());
            let Some(event) = next else { break };
            surface.handle_media_event(event, store);
            surface.sync(store);
        }
    }

    fn commands(surface: &ControlSurface<FakeHandle>) -> Vec<Command> {
        surface.handle().map(|handle| handle.commands.clone()).unwrap_or_default()
    }

    fn clear_commands(surface: &mut ControlSurface<FakeHandle>) {
        if let Some(handle) = surface.handle_mut() {
            handle.commands.clear();
        }
    }

    #[test]
    fn test_empty_queue_disables_everything() {
        let store = PlayerStore::new();
        let surface = mounted();

        let view = surface.view(&store);
        assert!(view.episode.is_none());
        assert_eq!(view.duration, 0);
        assert!(!view.any_enabled());
    }

    #[test]
    fn test_out_of_range_index_renders_empty() {
        let mut store = PlayerStore::new();
        let mut surface = mounted();
        store.play_list(vec![episode("a")], 3);
        pump(&mut surface, &mut store);

        let view = surface.view(&store);
        assert!(view.episode.is_none());
        assert!(!view.any_enabled());
        assert!(!commands(&surface).iter().any(|c| matches!(c, Command::Load(_))));
    }

    #[test]
    fn test_shuffle_disabled_for_single_episode() {
        let mut store = PlayerStore::new();
        let surface = mounted();

        store.play(episode("a"));
        let view = surface.view(&store);
        assert!(!view.shuffle.enabled);
        assert!(view.previous.enabled && view.next.enabled && view.looping.enabled);
        assert!(view.play_pause.enabled && view.play_pause.active);

        store.play_list(vec![episode("a"), episode("b")], 0);
        assert!(surface.view(&store).shuffle.enabled);
    }

    #[test]
    fn test_new_episode_loads_and_autoplays() {
        let mut store = PlayerStore::new();
        let mut surface = mounted();

        store.play(episode("a"));
        pump(&mut surface, &mut store);

        let commands = commands(&surface);
        assert!(commands.contains(&Command::Load("/podcasts/a.mp3".to_string())));
        assert!(commands.contains(&Command::Seek(Duration::ZERO)));
        assert!(store.is_playing());
        assert_eq!(surface.progress(), 0);
    }

    #[test]
    fn test_store_transitions_drive_the_handle() {
        let mut store = PlayerStore::new();
        let mut surface = mounted();
        store.play(episode("a"));
        pump(&mut surface, &mut store);
        clear_commands(&mut surface);

        surface.dispatch(UserAction::TogglePlay, &mut store).unwrap();
        pump(&mut surface, &mut store);
        assert_eq!(commands(&surface), vec![Command::Pause]);
        assert!(!store.is_playing());

        clear_commands(&mut surface);
        surface.dispatch(UserAction::TogglePlay, &mut store).unwrap();
        pump(&mut surface, &mut store);
        assert_eq!(commands(&surface), vec![Command::Play]);
        assert!(store.is_playing());
    }

    #[test]
    fn test_handle_events_do_not_echo_back() {
        let mut store = PlayerStore::new();
        let mut surface = mounted();
        store.play(episode("a"));
        pump(&mut surface, &mut store);
        clear_commands(&mut surface);

        // the handle paused on its own (e.g. the episode ended)
        if let Some(handle) = surface.handle_mut() {
            handle.playing = false;
        }
        surface.handle_media_event(MediaEvent::Pause, &mut store);
        surface.handle_media_event(MediaEvent::Pause, &mut store);
        surface.sync(&store);

        assert!(!store.is_playing());
        // one pause command at most, and it is a no-op on the handle
        assert!(commands(&surface).iter().all(|c| *c == Command::Pause));
        assert!(surface.handle().unwrap().events.is_empty());
    }

    #[test]
    fn test_progress_samples_floored_seconds() {
        let mut store = PlayerStore::new();
        let mut surface = mounted();

        // no metadata yet, so nothing is sampled
        surface.handle_media_event(MediaEvent::TimeUpdate(Duration::from_millis(5_500)), &mut store);
        assert_eq!(surface.progress(), 0);

        store.play(episode("a"));
        pump(&mut surface, &mut store);
        surface.handle_media_event(MediaEvent::TimeUpdate(Duration::from_millis(12_900)), &mut store);
        assert_eq!(surface.progress(), 12);
    }

    #[test]
    fn test_seek_mirrors_progress_immediately() {
        let mut store = PlayerStore::new();
        let mut surface = mounted();
        store.play(episode("a"));
        pump(&mut surface, &mut store);

        surface.seek(600, &store).unwrap();
        assert_eq!(surface.progress(), 600);
        assert_eq!(surface.handle().unwrap().position(), Duration::from_secs(600));

        // past the end clamps to the duration
        surface.seek(99_999, &store).unwrap();
        assert_eq!(surface.progress(), 1800);
    }

    #[test]
    fn test_seek_steps() {
        let mut store = PlayerStore::new();
        let mut surface = mounted();
        store.play(episode("a"));
        pump(&mut surface, &mut store);

        surface.dispatch(UserAction::SeekForward, &mut store).unwrap();
        surface.dispatch(UserAction::SeekForward, &mut store).unwrap();
        assert_eq!(surface.progress(), 20);
        surface.dispatch(UserAction::SeekBackward, &mut store).unwrap();
        assert_eq!(surface.progress(), 10);
        surface.dispatch(UserAction::SeekBackward, &mut store).unwrap();
        surface.dispatch(UserAction::SeekBackward, &mut store).unwrap();
        assert_eq!(surface.progress(), 0);
    }

    #[test]
    fn test_seek_without_handle_fails() {
        let mut store = PlayerStore::new();
        let mut surface: ControlSurface<FakeHandle> = ControlSurface::new(10);
        store.play(episode("a"));
        surface.sync(&store);

        assert!(matches!(surface.seek(30, &store), Err(SurfaceError::NotMounted)));
    }

    #[test]
    fn test_disabled_actions_are_ignored() {
        let mut store = PlayerStore::new();
        let mut surface = mounted();

        surface.dispatch(UserAction::TogglePlay, &mut store).unwrap();
        surface.dispatch(UserAction::ToggleLoop, &mut store).unwrap();
        surface.dispatch(UserAction::SeekTo(30), &mut store).unwrap();
        assert_eq!(store.state(), PlayerStore::new().state());

        store.play(episode("a"));
        surface.dispatch(UserAction::ToggleShuffle, &mut store).unwrap();
        assert!(!store.is_shuffling());
    }

    #[test]
    fn test_next_loads_next_episode() {
        let mut store = PlayerStore::new();
        let mut surface = mounted();
        store.play_list(vec![episode("a"), episode("b"), episode("c")], 0);
        pump(&mut surface, &mut store);
        surface.seek(300, &store).unwrap();
        clear_commands(&mut surface);

        surface.dispatch(UserAction::Next, &mut store).unwrap();
        pump(&mut surface, &mut store);

        assert_eq!(store.current_index(), 1);
        assert_eq!(surface.progress(), 0);
        assert!(commands(&surface).contains(&Command::Load("/podcasts/b.mp3".to_string())));
        assert_eq!(surface.view(&store).episode.unwrap().title, "b");
    }

    #[test]
    fn test_loop_flag_reaches_handle() {
        let mut store = PlayerStore::new();
        let mut surface = mounted();
        store.play(episode("a"));
        pump(&mut surface, &mut store);
        clear_commands(&mut surface);

        surface.dispatch(UserAction::ToggleLoop, &mut store).unwrap();
        assert_eq!(commands(&surface), vec![Command::SetLooping(true)]);
        assert!(surface.view(&store).looping.active);
    }

    #[test]
    fn test_failed_load_drops_to_paused() {
        let mut store = PlayerStore::new();
        let mut surface = ControlSurface::new(10);
        surface.mount(FakeHandle {
            fail_loads: true,
            ..FakeHandle::default()
        });

        store.play(episode("a"));
        pump(&mut surface, &mut store);

        assert!(!store.is_playing());
        assert!(surface.view(&store).episode.is_some());
    }

    #[test]
    fn test_sync_follows_store_changes() {
        let mut store = PlayerStore::new();
        let mut changes = store.subscribe();
        let mut surface = mounted();

        assert!(!surface.sync_if_changed(&store, &mut changes));
        assert!(commands(&surface).is_empty());

        store.play(episode("a"));
        assert!(surface.sync_if_changed(&store, &mut changes));
        assert!(commands(&surface).contains(&Command::Load("/podcasts/a.mp3".to_string())));

        clear_commands(&mut surface);
        assert!(!surface.sync_if_changed(&store, &mut changes));
        assert!(commands(&surface).is_empty());

        // a handle event that moves the store is picked up the same way
        surface.handle_media_event(MediaEvent::Pause, &mut store);
        assert!(surface.sync_if_changed(&store, &mut changes));
    }

    #[test]
    fn test_unmount_stops_handle() {
        let mut store = PlayerStore::new();
        let mut surface = mounted();
        store.play(episode("a"));
        pump(&mut surface, &mut store);

        let handle = surface.unmount().unwrap();
        assert_eq!(handle.commands.last(), Some(&Command::Stop));
        assert!(surface.handle().is_none());
    }
}
