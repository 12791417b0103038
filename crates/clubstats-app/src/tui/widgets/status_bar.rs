// Status bar widget: club name, player and client counts, metric tabs.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use clubstats_core::ranking::Metric;

use crate::tui::{LoadState, ViewState};

/// Layout: [club] [players] [clients] | [tabs] [load indicator] [quit prompt]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut spans = Vec::new();

    let club = state
        .dashboard
        .as_ref()
        .map(|d| d.club_name.as_str())
        .unwrap_or("clubstats");
    spans.push(Span::styled(
        format!(" {club} "),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    ));

    let players = state.dashboard.as_ref().map(|d| d.player_count).unwrap_or(0);
    spans.push(Span::styled(
        format!("{players} jugadores · {} clientes", state.client_count),
        Style::default().fg(Color::Gray),
    ));
    spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));

    spans.extend(tab_spans(state.active_metric));

    if let Some((text, color)) = load_indicator(&state.load_state) {
        spans.push(Span::styled(text, Style::default().fg(color)));
    }

    if state.confirm_quit {
        spans.push(Span::styled(
            " ¿Salir? (y/n) ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

/// One span per metric tab, e.g. "[1:Puntos]", with the active tab highlighted.
pub fn tab_spans(active: Metric) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for (i, metric) in Metric::ALL.iter().enumerate() {
        let style = if *metric == active {
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(format!("[{}:{}]", i + 1, metric.label()), style));
        spans.push(Span::raw(" "));
    }
    spans
}

pub fn load_indicator(load_state: &LoadState) -> Option<(&'static str, Color)> {
    match load_state {
        LoadState::Loading => Some(("● cargando", Color::Yellow)),
        LoadState::Ready => None,
        LoadState::NoData => Some(("● sin datos", Color::Gray)),
        LoadState::Failed(_) => Some(("● error", Color::Red)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
