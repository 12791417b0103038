// Screen layout: panel arrangement and sizing.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                               |
// +----------------+----------------+----------------+
// | 2nd (30%)      | 1st (40%)      | 3rd (30%)      |  Podium (7 rows)
// +----------------+----------------+----------------+
// | Standings table, ranks 4..N                      |
// +--------------------------------------------------+
// | Help Bar (1 row)                                 |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Height of the podium row, borders included.
pub const PODIUM_HEIGHT: u16 = 7;

/// Resolved screen areas for each dashboard zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Top row: club name, counts, metric tabs.
    pub status_bar: Rect,
    /// Podium cards, left to right: 2nd, 1st, 3rd.
    pub podium: [Rect; 3],
    /// Remaining ranks.
    pub standings: Rect,
    /// Bottom row: keyboard shortcut hints.
    pub help_bar: Rect,
}

pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),             // status bar
            Constraint::Length(PODIUM_HEIGHT), // podium
            Constraint::Min(3),                // standings
            Constraint::Length(1),             // help bar
        ])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(40),
            Constraint::Percentage(30),
        ])
        .split(vertical[1]);

    AppLayout {
        status_bar: vertical[0],
        podium: [columns[0], columns[1], columns[2]],
        standings: vertical[2],
        help_bar: vertical[3],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
