// Library root: re-exports the service modules so integration tests can
// drive the app loop and protocol directly.

pub mod app;
pub mod protocol;
pub mod tui;
pub mod ws_server;
