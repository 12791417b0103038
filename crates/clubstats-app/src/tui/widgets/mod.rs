// TUI widget modules for each dashboard panel.

pub mod podium;
pub mod profile;
pub mod standings;
pub mod status_bar;
