// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages for the app loop,
// or into local ViewState changes (metric tabs, cursor, profile view, quit
// prompt).

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use clubstats_core::ranking::Metric;

use super::ViewState;
use crate::protocol::UserCommand;

const PAGE_SIZE: usize = 10;

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// app loop, `None` when it was handled locally.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // crossterm reports Release events on some platforms.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    if key_event.modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    if view_state.confirm_quit {
        return handle_confirm_quit(key_event, view_state);
    }

    if view_state.profile.is_some() {
        return handle_profile(key_event, view_state);
    }

    match key_event.code {
        KeyCode::Char(c @ '1'..='4') => {
            let idx = (c as usize) - ('1' as usize);
            view_state.select_metric(Metric::ALL[idx]);
            None
        }
        KeyCode::Right | KeyCode::Tab | KeyCode::Char('l') => {
            cycle_metric(view_state, 1);
            None
        }
        KeyCode::Left | KeyCode::BackTab | KeyCode::Char('h') => {
            cycle_metric(view_state, Metric::ALL.len() - 1);
            None
        }

        KeyCode::Up | KeyCode::Char('k') => {
            move_up(view_state, 1);
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            move_down(view_state, 1);
            None
        }
        KeyCode::PageUp => {
            move_up(view_state, PAGE_SIZE);
            None
        }
        KeyCode::PageDown => {
            move_down(view_state, PAGE_SIZE);
            None
        }
        KeyCode::Enter => {
            view_state.open_profile();
            None
        }

        KeyCode::Char('r') => {
            view_state.begin_refresh(Instant::now());
            Some(UserCommand::Refresh)
        }

        KeyCode::Char('q') => {
            view_state.confirm_quit = true;
            None
        }

        _ => None,
    }
}

/// `y`/`q` confirm, `n`/Esc cancel, everything else is swallowed.
fn handle_confirm_quit(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('q') | KeyCode::Char('Q') => {
            Some(UserCommand::Quit)
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            view_state.confirm_quit = false;
            None
        }
        _ => None,
    }
}

/// Profile view: Esc, Enter or Backspace go back to the leaderboard.
fn handle_profile(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace => {
            view_state.close_profile();
            None
        }
        KeyCode::Char('r') => {
            view_state.begin_refresh(Instant::now());
            Some(UserCommand::Refresh)
        }
        KeyCode::Char('q') => {
            view_state.confirm_quit = true;
            None
        }
        _ => None,
    }
}

fn cycle_metric(view_state: &mut ViewState, step: usize) {
    let len = Metric::ALL.len();
    let current = Metric::ALL
        .iter()
        .position(|m| *m == view_state.active_metric)
        .unwrap_or(0);
    view_state.select_metric(Metric::ALL[(current + step) % len]);
}

fn move_up(view_state: &mut ViewState, rows: usize) {
    view_state.select(view_state.selected.saturating_sub(rows));
}

fn move_down(view_state: &mut ViewState, rows: usize) {
    view_state.select(view_state.selected.saturating_add(rows));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
