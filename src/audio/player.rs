use super::transport::{TickAction, Transport};
use super::{resolve_source, AudioConfig, MediaError, MediaEvent, MediaHandle};
use anyhow::Result;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// rodio-backed media handle. Lives on the thread that created it (the output stream is !Send).
pub struct AudioPlayer {
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    sink: Option<Sink>,
    source_path: Option<PathBuf>,
    transport: Transport,
    config: AudioConfig,
    event_sender: mpsc::UnboundedSender<MediaEvent>,
}

impl AudioPlayer {
    pub fn new(config: AudioConfig, event_sender: mpsc::UnboundedSender<MediaEvent>) -> Result<Self> {
        let (stream, stream_handle) = OutputStream::try_default()?;

        Ok(Self {
            _stream: stream,
            stream_handle,
            sink: None,
            source_path: None,
            transport: Transport::default(),
            config,
            event_sender,
        })
    }

    /// Sample the sink. Call this at the UI tick rate - it is the "native update cadence".
    pub fn poll(&mut self) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };

        match self.transport.on_tick(sink.empty()) {
            TickAction::Idle => {}
            TickAction::Sample => self.emit(MediaEvent::TimeUpdate(sink.get_pos())),
            TickAction::Restart => {
                debug!("Source drained, looping");
                if let Err(e) = self.refill() {
                    warn!("Failed to restart looping source: {}", e);
                    self.transport.playing = false;
                    self.emit(MediaEvent::Error(e.to_string()));
                    return;
                }
                self.emit(MediaEvent::TimeUpdate(Duration::ZERO));
            }
            TickAction::Finish => {
                info!("Episode finished");
                sink.pause();
                self.emit(MediaEvent::Pause);
                self.emit(MediaEvent::Ended);
            }
        }
    }

    fn emit(&self, event: MediaEvent) {
        // the receiver only goes away at shutdown
        let _ = self.event_sender.send(event);
    }

    fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>, MediaError> {
        let file = File::open(path).map_err(|source| MediaError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Decoder::new(BufReader::new(file)).map_err(|_| MediaError::Decode(path.display().to_string()))
    }

    fn open_source(&mut self, source: &str) -> Result<Option<Duration>, MediaError> {
        let path = resolve_source(source)?;
        let decoder = Self::open_decoder(&path)?;
        let duration = decoder.total_duration();

        let sink = Sink::try_new(&self.stream_handle).map_err(|e| MediaError::Output(e.to_string()))?;
        sink.pause();
        sink.set_volume(self.config.volume);
        sink.append(decoder);

        self.sink = Some(sink);
        self.source_path = Some(path);
        Ok(duration)
    }

    /// Re-append the loaded source after the sink ran dry.
    fn refill(&self) -> Result<(), MediaError> {
        let path = self.source_path.as_ref().ok_or(MediaError::NoSource)?;
        let sink = self.sink.as_ref().ok_or(MediaError::NoSource)?;
        let decoder = Self::open_decoder(path)?;
        sink.append(decoder);
        if self.transport.hold_after_refill() {
            sink.pause();
        }
        Ok(())
    }

    fn refill_if_drained(&mut self) -> Result<(), MediaError> {
        let drained = self.sink.as_ref().ok_or(MediaError::NoSource)?.empty();
        if drained {
            self.refill()?;
        }
        Ok(())
    }
}

impl MediaHandle for AudioPlayer {
    fn load(&mut self, source: &str, autoplay: bool) -> Result<(), MediaError> {
        self.stop();

        let result = self.open_source(source);

        let duration = match result {
            Ok(duration) => duration,
            Err(e) => {
                // tell the listener too, so the player drops back to paused
                self.emit(MediaEvent::Error(e.to_string()));
                return Err(e);
            }
        };

        info!("Loaded {} ({:?})", source, duration);
        self.emit(MediaEvent::MetadataLoaded { duration });

        if autoplay {
            self.play()?;
        }
        Ok(())
    }

    fn play(&mut self) -> Result<(), MediaError> {
        if self.transport.playing {
            return Ok(());
        }
        self.refill_if_drained()?;

        if let Some(sink) = self.sink.as_ref() {
            sink.play();
            self.transport.playing = true;
            self.emit(MediaEvent::Play);
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), MediaError> {
        if !self.transport.playing {
            return Ok(());
        }

        if let Some(sink) = self.sink.as_ref() {
            sink.pause();
        }
        self.transport.playing = false;
        self.emit(MediaEvent::Pause);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.source_path = None;
        self.transport.playing = false;
    }

    fn position(&self) -> Duration {
        self.sink.as_ref().map(|sink| sink.get_pos()).unwrap_or_default()
    }

    fn seek(&mut self, position: Duration) -> Result<(), MediaError> {
        self.refill_if_drained()?;

        let sink = self.sink.as_ref().ok_or(MediaError::NoSource)?;
        sink.try_seek(position).map_err(|e| MediaError::Seek(e.to_string()))?;
        debug!("Seeked to {:?}", position);
        Ok(())
    }

    fn set_looping(&mut self, looping: bool) {
        self.transport.looping = looping;
    }
}
