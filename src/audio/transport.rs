/// What the sink should do on a tick, decided from the handle's own flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    /// Nothing is playing.
    Idle,
    /// Report the current position.
    Sample,
    /// The source ran dry while looping; append it again.
    Restart,
    /// The source ran dry; pause the sink and report the end.
    Finish,
}

/// Playing/looping flags of a media handle, kept apart from the audio device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transport {
    pub playing: bool,
    pub looping: bool,
}

impl Transport {
    pub fn on_tick(&mut self, drained: bool) -> TickAction {
        if !self.playing {
            return TickAction::Idle;
        }
        if !drained {
            return TickAction::Sample;
        }

        if self.looping {
            TickAction::Restart
        } else {
            self.playing = false;
            TickAction::Finish
        }
    }

    /// Whether a sink must be (re)paused after a source is appended to it.
    /// A drained sink keeps its play flag, so a refill would otherwise start audio.
    pub fn hold_after_refill(&self) -> bool {
        !self.playing
    }
}
