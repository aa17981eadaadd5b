use crate::player::UserAction;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    // UI Events
    Quit,
    Tick,
    Render,

    // Catalog navigation
    Up,
    Down,
    PlaySelected, // queue the whole catalog, start at the selection
    PlaySingle,   // queue just the selection

    // Seek to n tenths of the episode
    SeekFraction(u8),

    // Control bar
    Control(UserAction),
}

pub struct EventHandler {
    event_sender: mpsc::UnboundedSender<AppEvent>,
    event_receiver: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();

        Self {
            event_sender,
            event_receiver,
        }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.event_sender.clone()
    }

    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.event_receiver.recv().await
    }

    /// Read the terminal on a blocking thread until the receiver goes away.
    pub fn spawn_terminal_reader(&self, poll_timeout: Duration) -> tokio::task::JoinHandle<()> {
        let sender = self.sender();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = read_terminal_events(&sender, poll_timeout) {
                warn!("Terminal reader stopped: {}", e);
            }
        })
    }

    /// Send a `Tick` every `tick_rate`, whether or not keys are coming in.
    pub fn spawn_ticker(&self, tick_rate: Duration) -> tokio::task::JoinHandle<()> {
        let sender = self.sender();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_rate);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if sender.send(AppEvent::Tick).is_err() {
                    debug!("Event receiver dropped, ticker exiting");
                    return;
                }
            }
        })
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn read_terminal_events(sender: &mpsc::UnboundedSender<AppEvent>, poll_timeout: Duration) -> Result<()> {
    loop {
        // the timeout only bounds how long a closed receiver goes unnoticed
        if !event::poll(poll_timeout)? {
            if sender.is_closed() {
                return Ok(());
            }
            continue;
        }

        let app_event = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => key_to_app_event(key),
            Event::Resize(_, _) => Some(AppEvent::Render),
            _ => None,
        };

        if let Some(app_event) = app_event {
            if sender.send(app_event).is_err() {
                debug!("Event receiver dropped, terminal reader exiting");
                return Ok(());
            }
        }
    }
}

pub fn key_to_app_event(key: KeyEvent) -> Option<AppEvent> {
    match key.code {
        // Quit
        KeyCode::Char('q') | KeyCode::Esc => Some(AppEvent::Quit),

        // Transport
        KeyCode::Char(' ') => Some(AppEvent::Control(UserAction::TogglePlay)),
        KeyCode::Char('n') => Some(AppEvent::Control(UserAction::Next)),
        KeyCode::Char('b') => Some(AppEvent::Control(UserAction::Previous)),
        KeyCode::Char('z') => Some(AppEvent::Control(UserAction::ToggleShuffle)),
        KeyCode::Char('r') => Some(AppEvent::Control(UserAction::ToggleLoop)),

        // Seek
        KeyCode::Right | KeyCode::Char('l') => Some(AppEvent::Control(UserAction::SeekForward)),
        KeyCode::Left | KeyCode::Char('h') => Some(AppEvent::Control(UserAction::SeekBackward)),
        KeyCode::Char(c @ '0'..='9') => c.to_digit(10).map(|tenths| AppEvent::SeekFraction(tenths as u8)),

        // Catalog
        KeyCode::Up | KeyCode::Char('k') => Some(AppEvent::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(AppEvent::Down),
        KeyCode::Enter => Some(AppEvent::PlaySelected),
        KeyCode::Char('p') => Some(AppEvent::PlaySingle),

        _ => None,
    }
}
