// Podium widget: top three of the selected metric, drawn 2nd | 1st | 3rd.

use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use clubstats_core::ranking::{Leaderboard, Standing};

use super::standings::{detail_text, value_text};
use crate::tui::ViewState;

/// Standing index shown in each podium column, left to right.
const COLUMN_RANKS: [usize; 3] = [1, 0, 2];

/// Render the three podium cards into `columns` (left, center, right).
pub fn render(frame: &mut Frame, columns: &[Rect; 3], state: &ViewState) {
    let Some(board) = state.current_board() else {
        return;
    };

    for ((area, standing), index) in columns.iter().zip(podium_slots(board)).zip(COLUMN_RANKS) {
        let card = match standing {
            Some(standing) => card(board, standing, index == state.selected),
            None => Paragraph::new("—")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL)),
        };
        frame.render_widget(card, *area);
    }
}

/// Podium occupants per column. Missing ranks leave their column empty so
/// the winner always stays in the center.
pub fn podium_slots(board: &Leaderboard) -> [Option<&Standing>; 3] {
    COLUMN_RANKS.map(|i| board.standings().get(i))
}

fn card<'a>(board: &Leaderboard, standing: &'a Standing, selected: bool) -> Paragraph<'a> {
    let color = rank_color(standing.rank);
    let mut border = Style::default().fg(color);
    if selected {
        border = border.add_modifier(Modifier::BOLD | Modifier::REVERSED);
    }
    let lines = vec![
        Line::from(Span::styled(
            standing.player.name(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("{} {}", value_text(board, standing), board.metric.label()),
            Style::default().fg(color),
        )),
        Line::from(detail_text(&standing.player)),
    ];

    Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(format!(" {}º ", standing.rank)),
    )
}

pub fn rank_color(rank: usize) -> Color {
    match rank {
        1 => Color::Yellow,
        2 => Color::Gray,
        3 => Color::Rgb(205, 127, 50),
        _ => Color::White,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
