// Club stats dashboard entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open database, restore admin sessions
// 4. Create mpsc channels
// 5. Spawn WebSocket server task
// 6. Spawn app logic task
// 7. Run the TUI until the user quits
// 8. Cleanup on exit

use std::time::Duration;

use clubstats_app::app;
use clubstats_app::tui;
use clubstats_app::ws_server;
use clubstats_core::auth::{ConfigCredentials, SessionManager};
use clubstats_core::config;
use clubstats_core::db;
use clubstats_core::photos::LocalPhotoStore;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("clubstats starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: club={}, {} traits, bucket={}",
        config.club.name,
        config.club.traits.len(),
        config.club.bucket
    );
    if config.credentials.admin_email.is_none() {
        warn!("No credentials.toml found; admin sign-in is disabled");
    }

    // 3. Open database and restore sessions
    let db = db::Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    let photos = LocalPhotoStore::new(&config.photos.dir, &config.photos.public_base_url);
    info!("Photos stored under {}", photos.root().display());

    let sessions = SessionManager::new(Box::new(ConfigCredentials::from_config(
        &config.credentials,
    )));
    let mut app_state = app::AppState::new(config.clone(), db, Box::new(photos), sessions);
    app_state
        .restore_sessions()
        .context("failed to restore admin sessions")?;

    // 4. Create mpsc channels
    let (ws_tx, ws_rx) = mpsc::channel(256);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    // 5. Spawn WebSocket server task
    let ws_port = config.ws_port;
    let ws_handle = tokio::spawn(async move {
        if let Err(e) = ws_server::run(ws_port, ws_tx).await {
            error!("WebSocket server error on port {}: {}", ws_port, e);
        }
    });

    // 6. Spawn app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(ws_rx, cmd_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 7. Run the TUI event loop (blocking until user quits)
    info!("Application ready. WebSocket server listening on 127.0.0.1:{}", ws_port);
    let load_timeout = Duration::from_millis(config.ui.load_timeout_ms);
    if let Err(e) = tui::run(ui_rx, cmd_tx, config.ranking.default_metric, load_timeout).await {
        error!("TUI error: {}", e);
    }

    // 8. Cleanup: wait for app task to finish (with timeout)
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    // The accept loop runs until aborted.
    ws_handle.abort();

    info!("clubstats shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (not the terminal, which is used by the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("clubstats.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("clubstats_app=info,clubstats_core=info,clubstats=info,warn")
            }),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
