use crate::audio::Episode;
use rand::Rng;
use tokio::sync::watch;
use tracing::debug;

/// Everything the rest of the app may know about playback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackState {
    pub queue: Vec<Episode>,
    pub current_index: usize,
    pub is_playing: bool,
    pub is_looping: bool,
    pub is_shuffling: bool,
}

impl PlaybackState {
    pub fn current_episode(&self) -> Option<&Episode> {
        self.queue.get(self.current_index)
    }
}

/// Owns the playback state. Mutation only goes through the methods below,
/// and every mutation bumps the revision seen by `subscribe()`.
#[derive(Debug)]
pub struct PlayerStore {
    state: PlaybackState,
    revision: watch::Sender<u64>,
}

impl PlayerStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: PlaybackState::default(),
            revision,
        }
    }

    /// Replace the queue with a single episode and start it.
    pub fn play(&mut self, episode: Episode) {
        debug!("Playing single episode '{}'", episode.title);
        self.state.queue = vec![episode];
        self.state.current_index = 0;
        self.state.is_playing = true;
        self.changed();
    }

    /// Replace the queue and start at `index`. The index is not checked: out of
    /// range just means there is no current episode.
    pub fn play_list(&mut self, list: Vec<Episode>, index: usize) {
        debug!("Playing list of {} episodes from index {}", list.len(), index);
        self.state.queue = list;
        self.state.current_index = index;
        self.state.is_playing = true;
        self.changed();
    }

    pub fn play_next(&mut self) {
        self.play_next_with(&mut rand::thread_rng());
    }

    pub fn play_next_with<R: Rng>(&mut self, rng: &mut R) {
        let next_index = self.state.current_index + 1;

        if self.state.is_shuffling {
            // floor(random * 0) is 0 for an empty queue
            self.state.current_index = if self.state.queue.is_empty() {
                0
            } else {
                rng.gen_range(0..self.state.queue.len())
            };
        } else if next_index < self.state.queue.len() {
            self.state.current_index = next_index;
        }

        debug!("Next -> index {}", self.state.current_index);
        self.changed();
    }

    /// Step back one episode. The guard is `> 0`, so index 1 never reaches 0.
    // FIXME: `>= 0` was probably intended; pinned by test_play_previous_never_reaches_first_episode
    pub fn play_previous(&mut self) {
        if let Some(previous_index) = self.state.current_index.checked_sub(1) {
            if previous_index > 0 {
                self.state.current_index = previous_index;
            }
        }

        debug!("Previous -> index {}", self.state.current_index);
        self.changed();
    }

    pub fn toggle_play(&mut self) {
        self.state.is_playing = !self.state.is_playing;
        debug!("is_playing = {}", self.state.is_playing);
        self.changed();
    }

    pub fn toggle_loop(&mut self) {
        self.state.is_looping = !self.state.is_looping;
        debug!("is_looping = {}", self.state.is_looping);
        self.changed();
    }

    pub fn toggle_shuffle(&mut self) {
        self.state.is_shuffling = !self.state.is_shuffling;
        debug!("is_shuffling = {}", self.state.is_shuffling);
        self.changed();
    }

    /// Reconcile with what the media handle reports. Idempotent.
    pub fn set_is_playing_state(&mut self, state: bool) {
        if self.state.is_playing == state {
            return;
        }
        self.state.is_playing = state;
        debug!("is_playing reconciled to {}", state);
        self.changed();
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn queue(&self) -> &[Episode] {
        &self.state.queue
    }

    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    pub fn current_episode(&self) -> Option<&Episode> {
        self.state.current_episode()
    }

    pub fn has_episode(&self) -> bool {
        self.current_episode().is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    pub fn is_looping(&self) -> bool {
        self.state.is_looping
    }

    pub fn is_shuffling(&self) -> bool {
        self.state.is_shuffling
    }

    /// Receiver whose value changes after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn changed(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

impl Default for PlayerStore {
    fn default() -> Self {
        Self::new()
    }
}
