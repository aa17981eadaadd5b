use super::{AppEvent, EventHandler, TerminalManager};
use crate::audio::{AudioConfig, AudioPlayer, Episode, MediaEvent};
use crate::config::Config;
use crate::player::{ButtonView, ControlSurface, ControlsView, PlayerStore, UserAction};
use anyhow::Result;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph},
    Frame,
};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

const EMPTY_PLAYER_TEXT: &str = "Select a podcast to listen to";

pub struct App {
    terminal: TerminalManager,
    event_handler: EventHandler,
    media_events: mpsc::UnboundedReceiver<MediaEvent>,
    tick_rate: Duration,

    catalog: Vec<Episode>,
    store: PlayerStore,
    store_changes: watch::Receiver<u64>,
    surface: ControlSurface<AudioPlayer>,

    list_state: ListState,
    should_quit: bool,
}

impl App {
    /// The store is built by the caller and handed in; the app is its only owner from here on.
    pub fn new(config: &Config, catalog: Vec<Episode>, store: PlayerStore) -> Result<Self> {
        let (media_sender, media_events) = mpsc::unbounded_channel();
        let audio_player = AudioPlayer::new(AudioConfig::from(config), media_sender)?;

        let mut surface = ControlSurface::new(config.ui.seek_step_seconds);
        surface.mount(audio_player);

        let mut list_state = ListState::default();
        if !catalog.is_empty() {
            list_state.select(Some(0));
        }

        let store_changes = store.subscribe();
        let terminal = TerminalManager::new()?;

        Ok(Self {
            terminal,
            event_handler: EventHandler::new(),
            media_events,
            tick_rate: Duration::from_millis(config.ui.tick_rate_ms.max(10)),
            catalog,
            store,
            store_changes,
            surface,
            list_state,
            should_quit: false,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let _reader = self.event_handler.spawn_terminal_reader(self.tick_rate);
        let ticker = self.event_handler.spawn_ticker(self.tick_rate);
        info!("Event loop started with {} episodes", self.catalog.len());

        while !self.should_quit {
            self.draw()?;

            tokio::select! {
                Some(event) = self.event_handler.next_event() => self.handle_event(event),
                Some(event) = self.media_events.recv() => self.surface.handle_media_event(event, &mut self.store),
                else => break,
            }

            // every store mutation reaches the handle through here, then the next draw
            self.surface.sync_if_changed(&self.store, &mut self.store_changes);
        }

        ticker.abort();
        self.surface.unmount();
        info!("Event loop finished");
        Ok(())
    }

    fn draw(&mut self) -> Result<()> {
        let view = self.surface.view(&self.store);
        let playing_url = self.store.current_episode().map(|episode| episode.url.as_str());
        let catalog = &self.catalog;
        let list_state = &mut self.list_state;

        self.terminal.draw(|f| render_ui(f, &view, catalog, playing_url, list_state))
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Quit => self.should_quit = true,
            AppEvent::Tick => {
                if let Some(player) = self.surface.handle_mut() {
                    player.poll();
                }
            }
            AppEvent::Render => {}
            AppEvent::Up => self.move_selection(-1),
            AppEvent::Down => self.move_selection(1),
            AppEvent::PlaySelected => {
                if let Some(index) = self.selected_index() {
                    self.store.play_list(self.catalog.clone(), index);
                }
            }
            AppEvent::PlaySingle => {
                if let Some(episode) = self.selected_index().and_then(|index| self.catalog.get(index)) {
                    self.store.play(episode.clone());
                }
            }
            AppEvent::SeekFraction(tenths) => {
                let duration = self.surface.view(&self.store).duration;
                self.control(UserAction::SeekTo(seek_target(duration, tenths)));
            }
            AppEvent::Control(action) => self.control(action),
        }
    }

    fn control(&mut self, action: UserAction) {
        debug!("Control {:?}", action);
        if let Err(e) = self.surface.dispatch(action, &mut self.store) {
            warn!("{:?} failed: {}", action, e);
        }
    }

    fn selected_index(&self) -> Option<usize> {
        self.list_state.selected().filter(|&index| index < self.catalog.len())
    }

    fn move_selection(&mut self, delta: i32) {
        if self.catalog.is_empty() {
            return;
        }

        let current = self.list_state.selected().unwrap_or(0);
        let new_index = if delta < 0 {
            current.saturating_sub(delta.unsigned_abs() as usize)
        } else {
            (current + delta as usize).min(self.catalog.len() - 1)
        };

        self.list_state.select(Some(new_index));
    }
}

/// `tenths`/10 of `duration`, without overflowing on huge durations.
pub(crate) fn seek_target(duration: u64, tenths: u8) -> u64 {
    let tenths = u64::from(tenths.min(10));
    duration / 10 * tenths + duration % 10 * tenths / 10
}

/// `HH:MM:SS`, zero padded.
pub(crate) fn format_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

pub(crate) fn render_ui(
    f: &mut Frame,
    view: &ControlsView,
    catalog: &[Episode],
    playing_url: Option<&str>,
    list_state: &mut ListState,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Catalog + now playing
            Constraint::Length(3), // Progress
            Constraint::Length(3), // Controls
        ])
        .split(f.area());

    render_header(f, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);
    render_catalog(f, body[0], catalog, playing_url, list_state);
    render_now_playing(f, body[1], view);

    render_progress(f, chunks[2], view);
    render_controls(f, chunks[3], view);
}

fn render_header(f: &mut Frame, area: Rect) {
    let title = Paragraph::new("🎧 podbar - Now playing")
        .style(Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(title, area);
}

fn render_catalog(
    f: &mut Frame,
    area: Rect,
    catalog: &[Episode],
    playing_url: Option<&str>,
    list_state: &mut ListState,
) {
    let items: Vec<ListItem> = catalog
        .iter()
        .map(|episode| {
            let is_current = playing_url == Some(episode.url.as_str());
            let prefix = if is_current { "♪ " } else { "  " };
            let content = format!(
                "{}{} - {} ({})",
                prefix,
                episode.display_title(),
                episode.members,
                format_time(episode.duration)
            );

            let style = if is_current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(content).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Episodes"))
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("► ");

    f.render_stateful_widget(list, area, list_state);
}

fn render_now_playing(f: &mut Frame, area: Rect, view: &ControlsView) {
    let block = Block::default().borders(Borders::ALL).title("Now Playing");

    let lines = match &view.episode {
        Some(episode) => vec![
            Line::from(Span::styled(
                episode.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(episode.members.clone()),
            Line::from(Span::styled(
                episode.thumbnail.clone(),
                Style::default().fg(Color::DarkGray),
            )),
        ],
        None => vec![Line::from(Span::styled(
            EMPTY_PLAYER_TEXT,
            Style::default().add_modifier(Modifier::BOLD),
        ))],
    };

    let alignment = if view.episode.is_some() {
        Alignment::Left
    } else {
        Alignment::Center
    };
    f.render_widget(Paragraph::new(lines).alignment(alignment).block(block), area);
}

fn render_progress(f: &mut Frame, area: Rect, view: &ControlsView) {
    let ratio = if view.duration == 0 {
        0.0
    } else {
        (view.progress as f64 / view.duration as f64).clamp(0.0, 1.0)
    };
    let label = format!("{} / {}", format_time(view.progress), format_time(view.duration));
    let color = if view.seek_enabled { Color::Green } else { Color::DarkGray };

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().fg(color))
        .ratio(ratio)
        .label(label);
    f.render_widget(gauge, area);
}

fn button(symbol: &str, button: ButtonView) -> Span<'static> {
    let style = if !button.enabled {
        Style::default().fg(Color::DarkGray)
    } else if button.active {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };
    Span::styled(format!(" {} ", symbol), style)
}

fn render_controls(f: &mut Frame, area: Rect, view: &ControlsView) {
    let play_symbol = if view.play_pause.active { "⏸" } else { "▶" };
    // the play button is never drawn "active" - its symbol already says it
    let play_button = ButtonView {
        active: false,
        ..view.play_pause
    };

    let controls = Line::from(vec![
        button("🔀", view.shuffle),
        button("⏮", view.previous),
        button(play_symbol, play_button),
        button("⏭", view.next),
        button("🔁", view.looping),
    ]);

    let widget = Paragraph::new(controls)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(widget, area);
}
