// Standings widget: table of ranks 4..N for the selected metric.
//
// Columns: #, Nombre, metric value, detail (goals/assists or saves/clean
// sheets for goalkeepers). Legendary players show LEYENDA instead of numbers.

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Row, Table};
use ratatui::Frame;

use clubstats_core::model::AggregatedPlayer;
use clubstats_core::ranking::{Leaderboard, Standing, PODIUM_SIZE};

use crate::tui::ViewState;

/// Shown in place of any number for legendary players.
pub const LEGEND_LABEL: &str = "LEYENDA";

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let Some(board) = state.current_board() else {
        return;
    };

    let header = Row::new(vec![
        Cell::from("#"),
        Cell::from("Nombre"),
        Cell::from(board.metric.label()),
        Cell::from("Detalle"),
    ])
    .style(
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = board
        .remainder()
        .iter()
        .enumerate()
        .skip(state.scroll_offset)
        .map(|(i, standing)| {
            let mut style = if standing.player.player.is_legendary {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            if i + PODIUM_SIZE == state.selected {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Row::new(vec![
                Cell::from(standing.rank.to_string()),
                Cell::from(standing.player.name().to_string()),
                Cell::from(value_text(board, standing)),
                Cell::from(detail_text(&standing.player)),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Min(16),
        Constraint::Length(12),
        Constraint::Min(20),
    ];

    let title = format!("Clasificación ({})", board.len());
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title));

    frame.render_widget(table, area);
}

/// The board's metric value for `standing`, or LEYENDA.
pub fn value_text(board: &Leaderboard, standing: &Standing) -> String {
    if standing.player.player.is_legendary {
        LEGEND_LABEL.to_string()
    } else {
        board.value(standing).to_string()
    }
}

/// Secondary stats: saves and clean sheets for goalkeepers, goals and
/// assists for everyone else.
pub fn detail_text(player: &AggregatedPlayer) -> String {
    if player.player.is_legendary {
        return LEGEND_LABEL.to_string();
    }
    if player.player.is_goalkeeper() {
        format!(
            "Atajadas {} · Vallas {}",
            player.total_saves, player.total_clean_sheets
        )
    } else {
        format!(
            "Goles {} · Asist. {}",
            player.total_goals, player.total_assists
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
