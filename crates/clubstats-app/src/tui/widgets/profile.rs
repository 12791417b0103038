// Profile widget: one player's card and attribute bars, opened from the
// leaderboard cursor.
//
// Left: name, status, global rank, headline stats, description, traits.
// Right: five role-specific ratings as horizontal bars.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use clubstats_core::profile::{self, Rating, NO_TRAITS, RATING_CAP};
use clubstats_core::ranking::Standing;

use super::podium::rank_color;
use super::standings::LEGEND_LABEL;
use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let Some(standing) = state.profile_standing() else {
        let paragraph = Paragraph::new("Jugador no encontrado.")
            .style(Style::default().fg(Color::Gray))
            .block(Block::default().borders(Borders::ALL).title("Perfil"));
        frame.render_widget(paragraph, area);
        return;
    };

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let card = Paragraph::new(card_lines(standing))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(rank_color(standing.rank)))
                .title(format!(" {} ", standing.player.name())),
        );
    frame.render_widget(card, columns[0]);

    let ratings = profile::ratings(&standing.player);
    frame.render_widget(rating_chart(&ratings), columns[1]);
}

/// Card text for `standing`, ranked on the points board.
pub fn card_lines(standing: &Standing) -> Vec<Line<'static>> {
    let player = &standing.player;
    let label = Style::default().fg(Color::Gray);
    let heading = Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD);

    let status_color = if player.player.is_legendary {
        Color::Yellow
    } else {
        Color::Green
    };
    let points = if player.player.is_legendary {
        LEGEND_LABEL.to_string()
    } else {
        player.total_points.to_string()
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(" Estado: ", label),
            Span::styled(
                profile::status_label(&player.player),
                Style::default()
                    .fg(status_color)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled(" Total Puntos: ", label),
            Span::styled(points, heading),
            Span::styled(
                format!("   # {} GLOBAL", standing.rank),
                Style::default().fg(rank_color(standing.rank)),
            ),
        ]),
    ];

    if let Some([first, second]) = profile::headline_stats(player) {
        lines.push(Line::from(vec![
            Span::styled(format!(" {}: ", first.0), label),
            Span::raw(first.1.to_string()),
            Span::styled(format!("   {}: ", second.0), label),
            Span::raw(second.1.to_string()),
        ]));
    }

    let mut ids = vec![
        Span::styled(" Player ID: ", label),
        Span::raw(profile::short_id(&player.player).to_string()),
    ];
    if let Some(year) = profile::joined_year(&player.player) {
        ids.push(Span::styled(format!("   Joined {year}"), label));
    }
    lines.push(Line::from(ids));

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(" Descripción", heading)));
    lines.push(Line::from(format!(
        " {}",
        profile::description(&player.player)
    )));

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(" Rasgos Especiales", heading)));
    let traits = if player.player.traits.is_empty() {
        NO_TRAITS.to_string()
    } else {
        player.player.traits.join(" · ")
    };
    lines.push(Line::from(format!(" {traits}")));

    lines
}

fn rating_chart(ratings: &[Rating]) -> BarChart<'static> {
    let bars: Vec<Bar> = ratings
        .iter()
        .map(|r| {
            Bar::default()
                .value(u64::from(r.value))
                .label(Line::from(r.label))
                .text_value(r.value.to_string())
                .style(Style::default().fg(rating_color(r.value)))
        })
        .collect();

    BarChart::default()
        .block(Block::default().borders(Borders::ALL).title("Atributos"))
        .data(BarGroup::default().bars(&bars))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(1)
        .max(u64::from(RATING_CAP))
}

fn rating_color(value: u8) -> Color {
    match value {
        75.. => Color::Green,
        45..=74 => Color::Yellow,
        _ => Color::Red,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
