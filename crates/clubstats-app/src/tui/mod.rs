// TUI dashboard: layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState` holding the latest `Dashboard` pushed by the app
// loop. It applies `UiUpdate` messages as they arrive and re-renders at
// ~30 fps.

pub mod input;
pub mod layout;
pub mod widgets;

use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use tokio::sync::mpsc;

use clubstats_core::model::PlayerId;
use clubstats_core::ranking::{Leaderboard, Metric, Standing, PODIUM_SIZE};

use crate::protocol::{Dashboard, UiUpdate, UserCommand};

use layout::build_layout;

/// Default wait for the first dashboard before showing "no data".
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_millis(5000);

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Waiting for the first dashboard.
    Loading,
    Ready,
    /// Nothing arrived within the load timeout.
    NoData,
    /// The last read failed.
    Failed(String),
}

/// TUI-local state rendered by `render_frame`.
pub struct ViewState {
    pub dashboard: Option<Dashboard>,
    pub load_state: LoadState,
    pub loading_since: Instant,
    pub load_timeout: Duration,
    pub active_metric: Metric,
    /// Connected WebSocket clients.
    pub client_count: usize,
    /// Cursor into the current board's standings; 0 is first place.
    pub selected: usize,
    /// First remainder row shown in the standings table.
    pub scroll_offset: usize,
    /// Player whose profile replaces the leaderboard, if any.
    pub profile: Option<PlayerId>,
    pub confirm_quit: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState::new(Metric::default(), DEFAULT_LOAD_TIMEOUT)
    }
}

impl ViewState {
    pub fn new(active_metric: Metric, load_timeout: Duration) -> Self {
        ViewState {
            dashboard: None,
            load_state: LoadState::Loading,
            loading_since: Instant::now(),
            load_timeout,
            active_metric,
            client_count: 0,
            selected: 0,
            scroll_offset: 0,
            profile: None,
            confirm_quit: false,
        }
    }

    /// The board for the selected metric tab.
    pub fn current_board(&self) -> Option<&Leaderboard> {
        self.dashboard.as_ref()?.board(self.active_metric)
    }

    /// Stop the loading indicator once the timeout has passed.
    pub fn check_load_timeout(&mut self, now: Instant) {
        if self.load_state == LoadState::Loading
            && now.saturating_duration_since(self.loading_since) >= self.load_timeout
        {
            self.load_state = LoadState::NoData;
        }
    }

    /// Re-enter the loading state while a refresh is in flight, unless a
    /// dashboard is already on screen.
    pub fn begin_refresh(&mut self, now: Instant) {
        if self.dashboard.is_none() {
            self.load_state = LoadState::Loading;
            self.loading_since = now;
        }
    }

    pub fn select_metric(&mut self, metric: Metric) {
        if self.active_metric != metric {
            self.active_metric = metric;
            self.select(0);
        }
    }

    /// Move the cursor, clamped to the current board. A selected table row
    /// is scrolled to the top of the standings table.
    pub fn select(&mut self, index: usize) {
        self.selected = index.min(self.max_selected());
        self.scroll_offset = self.selected.saturating_sub(PODIUM_SIZE);
    }

    /// Last valid cursor position for the current board.
    pub fn max_selected(&self) -> usize {
        self.current_board()
            .map(|b| b.len().saturating_sub(1))
            .unwrap_or(0)
    }

    pub fn selected_standing(&self) -> Option<&Standing> {
        self.current_board()?.standings().get(self.selected)
    }

    /// Show the profile of the player under the cursor.
    pub fn open_profile(&mut self) {
        self.profile = self.selected_standing().map(|s| s.player.id().clone());
    }

    pub fn close_profile(&mut self) {
        self.profile = None;
    }

    /// The open profile's standing on the points board, which carries the
    /// player's global rank.
    pub fn profile_standing(&self) -> Option<&Standing> {
        let id = self.profile.as_ref()?;
        self.dashboard
            .as_ref()?
            .board(Metric::Points)?
            .standings()
            .iter()
            .find(|s| s.player.id() == id)
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Dashboard(dashboard) => {
            state.dashboard = Some(*dashboard);
            state.load_state = LoadState::Ready;
            state.select(state.selected);
            // Deleted players take their open profile with them.
            if state.profile.is_some() && state.profile_standing().is_none() {
                state.close_profile();
            }
        }
        UiUpdate::ClientCount(count) => {
            state.client_count = count;
        }
        UiUpdate::LoadFailed(message) => {
            state.load_state = LoadState::Failed(message);
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);
    match placeholder_text(state) {
        Some(text) => {
            let area = layout.podium[0]
                .union(layout.podium[2])
                .union(layout.standings);
            render_placeholder(frame, area, &text);
        }
        None if state.profile.is_some() => {
            let area = layout.podium[0]
                .union(layout.podium[2])
                .union(layout.standings);
            widgets::profile::render(frame, area, state);
        }
        None => {
            widgets::podium::render(frame, &layout.podium, state);
            widgets::standings::render(frame, layout.standings, state);
        }
    }
    render_help_bar(frame, state, &layout);
}

/// Text shown instead of the leaderboard, if the board cannot be drawn.
pub fn placeholder_text(state: &ViewState) -> Option<String> {
    match &state.load_state {
        LoadState::Failed(message) => Some(format!("Error al cargar los datos: {message}")),
        LoadState::Loading if state.dashboard.is_none() => Some("Cargando...".to_string()),
        LoadState::NoData if state.dashboard.is_none() => {
            Some("No hay datos disponibles.".to_string())
        }
        _ => match state.current_board() {
            Some(board) if !board.is_empty() => None,
            _ => Some("No hay datos disponibles.".to_string()),
        },
    }
}

fn render_placeholder(frame: &mut Frame, area: ratatui::layout::Rect, text: &str) {
    let paragraph = Paragraph::new(text.to_string())
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL).title("Ranking"));
    frame.render_widget(paragraph, area);
}

fn render_help_bar(frame: &mut Frame, state: &ViewState, layout: &layout::AppLayout) {
    let text = if state.profile.is_some() {
        " q:Salir | Esc/Enter:Volver | r:Recargar"
    } else {
        " q:Salir | 1-4/←→:Métrica | ↑↓:Seleccionar | Enter:Perfil | r:Recargar"
    };
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        text,
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::DIM),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, layout.help_bar);
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// Initializes the terminal, installs a panic hook that restores it, then
/// selects over UI updates, keyboard input, and render ticks until the user
/// quits or the app loop closes the update channel.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
    default_metric: Metric,
    load_timeout: Duration,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::new(default_metric, load_timeout);
    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    None => break,
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break;
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }

            _ = render_tick.tick() => {
                view_state.check_load_timeout(Instant::now());
                terminal.draw(|frame| render_frame(frame, &view_state))?;
            }
        }
    }

    ratatui::restore();
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
