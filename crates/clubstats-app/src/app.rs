// Application state and orchestration logic.
//
// The central event loop owns the store, the admin sessions, and the set of
// connected WebSocket clients. It answers client requests, and after every
// successful mutation rebuilds the leaderboards and pushes them to the TUI.

use std::collections::HashMap;

use base64::Engine;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use clubstats_core::auth::{AdminSession, AuthError, SessionManager};
use clubstats_core::config::Config;
use clubstats_core::db::Database;
use clubstats_core::model::{PlayerId, StatLine, StatRecord};
use clubstats_core::photos::{photo_key, PhotoStore};
use clubstats_core::ranking::{rank, rank_all, RankingOptions};
use clubstats_core::scoring::{checked_points, Role};
use clubstats_core::store::{load_aggregated, NewPlayer, PlayerStore, PlayerUpdate};

use crate::protocol::{
    ClientRequest, Dashboard, ErrorKind, LeaderboardView, PhotoUpload, ServerResponse, UiUpdate,
    UserCommand,
};
use crate::ws_server::WsEvent;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a client request was refused.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    NotFound(String),

    #[error("data access failed: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl RequestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RequestError::Validation(_) => ErrorKind::Validation,
            RequestError::Auth(AuthError::Store(_)) => ErrorKind::DataAccess,
            RequestError::Auth(_) => ErrorKind::Auth,
            RequestError::NotFound(_) => ErrorKind::NotFound,
            RequestError::Store(_) => ErrorKind::DataAccess,
        }
    }

    pub fn into_response(self) -> ServerResponse {
        ServerResponse::Error {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub photos: Box<dyn PhotoStore>,
    pub sessions: SessionManager,
    /// Outbound queues of connected clients, keyed by connection id.
    pub clients: HashMap<u64, mpsc::Sender<String>>,
    ranking: RankingOptions,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Database,
        photos: Box<dyn PhotoStore>,
        sessions: SessionManager,
    ) -> Self {
        let ranking = config.ranking.options();
        AppState {
            config,
            db,
            photos,
            sessions,
            clients: HashMap::new(),
            ranking,
        }
    }

    /// Restore admin sessions persisted by a previous run.
    pub fn restore_sessions(&mut self) -> Result<usize, AuthError> {
        self.sessions.init(&self.db)
    }

    fn bucket(&self) -> &str {
        &self.config.club.bucket
    }

    /// Re-read the store and rank every metric.
    pub fn build_dashboard(&self) -> anyhow::Result<Dashboard> {
        let players = load_aggregated(&self.db, self.bucket())?;
        let boards = rank_all(&players, &self.ranking);
        Ok(Dashboard {
            club_name: self.config.club.name.clone(),
            player_count: players.len(),
            boards,
        })
    }

    /// Parse and answer one raw client message.
    pub fn handle_message(&mut self, text: &str) -> ServerResponse {
        let request: ClientRequest = match serde_json::from_str(text) {
            Ok(r) => r,
            Err(e) => {
                warn!("Failed to parse client message: {}", e);
                return RequestError::Validation(format!("malformed request: {e}")).into_response();
            }
        };

        let kind = request.kind();
        match self.handle_request(request) {
            Ok(response) => {
                debug!("{} handled", kind);
                response
            }
            Err(e) => {
                warn!("{} rejected: {}", kind, e);
                e.into_response()
            }
        }
    }

    pub fn handle_request(&mut self, request: ClientRequest) -> Result<ServerResponse, RequestError> {
        let line = request.stat_line();
        match request {
            ClientRequest::GetLeaderboard { metric } => {
                let metric = metric.unwrap_or(self.config.ranking.default_metric);
                let players = load_aggregated(&self.db, self.bucket())?;
                let board = rank(&players, metric, &self.ranking);
                Ok(ServerResponse::Leaderboard(LeaderboardView::from(&board)))
            }
            ClientRequest::GetPlayers => {
                let players = load_aggregated(&self.db, self.bucket())?;
                Ok(ServerResponse::Players { players })
            }
            ClientRequest::SignIn { email, password } => {
                let session = self.sessions.sign_in(&self.db, &email, &password)?;
                Ok(ServerResponse::SignedIn {
                    token: session.token,
                    email: session.email,
                })
            }
            ClientRequest::SignOut { token } => {
                if self.sessions.sign_out(&self.db, &token)? {
                    Ok(ServerResponse::SignedOut)
                } else {
                    Err(AuthError::Unauthorized.into())
                }
            }
            ClientRequest::AddPlayer {
                token,
                name,
                description,
                traits,
                is_legendary,
                photo,
            } => {
                let session = self.authorize(&token)?;
                let player = NewPlayer {
                    name: name.trim().to_string(),
                    description,
                    traits,
                    is_legendary,
                    photo_url: String::new(),
                };
                let player_id = self.add_player(&session, player, photo)?;
                Ok(ServerResponse::PlayerSaved { player_id })
            }
            ClientRequest::UpdatePlayer {
                token,
                player_id,
                name,
                description,
                traits,
                is_legendary,
                photo,
            } => {
                let session = self.authorize(&token)?;
                let update = PlayerUpdate {
                    name: name.map(|n| n.trim().to_string()),
                    description,
                    traits,
                    is_legendary,
                    photo_url: None,
                };
                self.update_player(&session, &player_id, update, photo)?;
                Ok(ServerResponse::PlayerSaved { player_id })
            }
            ClientRequest::DeletePlayer { token, player_id } => {
                let session = self.authorize(&token)?;
                self.delete_player(&session, &player_id)?;
                Ok(ServerResponse::PlayerDeleted { player_id })
            }
            ClientRequest::RecordStat {
                token, player_id, ..
            } => {
                let session = self.authorize(&token)?;
                let stat = self.record_stat(&session, &player_id, &line.unwrap_or_default())?;
                Ok(ServerResponse::StatRecorded { stat })
            }
            ClientRequest::DeleteStat { token, stat_id } => {
                let session = self.authorize(&token)?;
                self.delete_stat(&session, &stat_id)?;
                Ok(ServerResponse::StatDeleted { stat_id })
            }
        }
    }

    fn authorize(&self, token: &str) -> Result<AdminSession, RequestError> {
        Ok(self.sessions.authorize(token)?.clone())
    }

    // ------------------------------------------------------------------
    // Admin mutations
    // ------------------------------------------------------------------

    fn add_player(
        &self,
        session: &AdminSession,
        mut player: NewPlayer,
        photo: Option<PhotoUpload>,
    ) -> Result<PlayerId, RequestError> {
        validate_name(&player.name)?;
        self.validate_traits(&player.traits)?;
        if let Some(photo) = photo {
            player.photo_url = self.store_photo(&photo)?;
        }

        let id = self.db.create_player(&player)?;
        info!("{} added player {} ({})", session.email, player.name, id);
        Ok(id)
    }

    fn update_player(
        &self,
        session: &AdminSession,
        id: &PlayerId,
        mut update: PlayerUpdate,
        photo: Option<PhotoUpload>,
    ) -> Result<(), RequestError> {
        if let Some(ref name) = update.name {
            validate_name(name)?;
        }
        if let Some(ref traits) = update.traits {
            self.validate_traits(traits)?;
        }
        if !self.db.player_exists(id)? {
            return Err(player_not_found(id));
        }
        if let Some(photo) = photo {
            update.photo_url = Some(self.store_photo(&photo)?);
        }
        if update.is_empty() {
            return Err(RequestError::Validation("nothing to update".into()));
        }

        if !self.db.update_player(id, &update)? {
            return Err(player_not_found(id));
        }
        info!("{} updated player {}", session.email, id);
        Ok(())
    }

    fn delete_player(&self, session: &AdminSession, id: &PlayerId) -> Result<(), RequestError> {
        if !self.db.delete_player(id)? {
            return Err(player_not_found(id));
        }
        info!("{} deleted player {} and their stats", session.email, id);
        Ok(())
    }

    fn record_stat(
        &self,
        session: &AdminSession,
        id: &PlayerId,
        line: &StatLine,
    ) -> Result<StatRecord, RequestError> {
        let Some(player) = self.db.load_player(id)? else {
            return Err(player_not_found(id));
        };
        let current = self
            .db
            .load_stat(id, self.bucket())?
            .map(|r| r.line)
            .unwrap_or_default();
        let fits = current
            .checked_add(line)
            .and_then(|total| checked_points(Role::of(&player), &total))
            .is_some();
        if !fits {
            return Err(RequestError::Validation(format!(
                "increment for player {id} would overflow the stored totals"
            )));
        }

        let record = self.db.record_stat(id, self.bucket(), line)?;
        info!(
            "{} recorded {:?} for player {} (stat {})",
            session.email, line, id, record.id
        );
        Ok(record)
    }

    fn delete_stat(&self, session: &AdminSession, stat_id: &str) -> Result<(), RequestError> {
        if !self.db.delete_stat(stat_id)? {
            return Err(RequestError::NotFound(format!("stat {stat_id} not found")));
        }
        info!("{} deleted stat {}", session.email, stat_id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Validation helpers
    // ------------------------------------------------------------------

    fn validate_traits(&self, traits: &[String]) -> Result<(), RequestError> {
        let allowed = &self.config.club.traits;
        match traits.iter().find(|t| !allowed.contains(t)) {
            Some(unknown) => Err(RequestError::Validation(format!(
                "unknown trait \"{unknown}\"; expected one of: {}",
                allowed.join(", ")
            ))),
            None => Ok(()),
        }
    }

    fn store_photo(&self, photo: &PhotoUpload) -> Result<String, RequestError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(photo.data_base64.trim())
            .map_err(|e| RequestError::Validation(format!("photo is not valid base64: {e}")))?;
        if bytes.is_empty() {
            return Err(RequestError::Validation("photo is empty".into()));
        }
        let key = photo_key(chrono::Utc::now(), &photo.file_name);
        Ok(self.photos.upload(&key, &bytes)?)
    }
}

fn validate_name(name: &str) -> Result<(), RequestError> {
    if name.trim().is_empty() {
        return Err(RequestError::Validation("player name must not be empty".into()));
    }
    Ok(())
}

fn player_not_found(id: &PlayerId) -> RequestError {
    RequestError::NotFound(format!("player {id} not found"))
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens on two channels using `tokio::select!`:
/// 1. WebSocket events from clients
/// 2. User commands from the TUI
///
/// Pushes UI updates through `ui_tx` for the TUI render loop.
pub async fn run(
    mut ws_rx: mpsc::Receiver<WsEvent>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");
    push_dashboard(&state, &ui_tx).await;

    loop {
        tokio::select! {
            // --- WebSocket events ---
            ws_event = ws_rx.recv() => {
                match ws_event {
                    Some(event) => handle_ws_event(&mut state, event, &ui_tx).await,
                    None => {
                        info!("WebSocket channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(UserCommand::Refresh) => {
                        info!("Dashboard refresh requested");
                        push_dashboard(&state, &ui_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }
        }
    }

    info!("Application event loop exiting");
    Ok(())
}

/// Apply one WebSocket event: track the client set or answer a request.
pub async fn handle_ws_event(state: &mut AppState, event: WsEvent, ui_tx: &mpsc::Sender<UiUpdate>) {
    match event {
        WsEvent::Connected {
            conn_id,
            addr,
            outbound,
        } => {
            info!("Client {} connected from {}", conn_id, addr);
            state.clients.insert(conn_id, outbound);
            let _ = ui_tx.send(UiUpdate::ClientCount(state.clients.len())).await;
        }
        WsEvent::Disconnected { conn_id } => {
            info!("Client {} disconnected", conn_id);
            state.clients.remove(&conn_id);
            let _ = ui_tx.send(UiUpdate::ClientCount(state.clients.len())).await;
        }
        WsEvent::Message { conn_id, text } => {
            let response = state.handle_message(&text);
            let mutated = response.is_mutation();
            if !reply(state, conn_id, &response) {
                let _ = ui_tx.send(UiUpdate::ClientCount(state.clients.len())).await;
            }
            if mutated {
                push_dashboard(state, ui_tx).await;
            }
        }
    }
}

/// Queue `response` for `conn_id` without waiting. A client whose queue is
/// full or closed is dropped from the client set; returns `false` then.
fn reply(state: &mut AppState, conn_id: u64, response: &ServerResponse) -> bool {
    let Some(outbound) = state.clients.get(&conn_id) else {
        debug!("Dropping reply for unknown connection {}", conn_id);
        return true;
    };
    let json = match serde_json::to_string(response) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            return true;
        }
    };
    match outbound.try_send(json) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!("Connection {} is not reading its replies, dropping it", conn_id);
            state.clients.remove(&conn_id);
            false
        }
        Err(TrySendError::Closed(_)) => {
            debug!("Connection {} went away before its reply", conn_id);
            state.clients.remove(&conn_id);
            false
        }
    }
}

/// Rebuild the leaderboards and send them to the TUI. A failed read is
/// reported as `LoadFailed` so the dashboard can show its error state.
pub async fn push_dashboard(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let update = match state.build_dashboard() {
        Ok(dashboard) => UiUpdate::Dashboard(Box::new(dashboard)),
        Err(e) => {
            error!("Failed to load dashboard data: {:#}", e);
            UiUpdate::LoadFailed(format!("{e:#}"))
        }
    };
    let _ = ui_tx.send(update).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use clubstats_core::auth::ConfigCredentials;
    use clubstats_core::config::{
        ClubConfig, CredentialsConfig, PhotoConfig, RankingConfig, UiConfig,
    };
    use clubstats_core::ranking::Metric;
    use clubstats_core::store::SnapshotProvider;
    use std::sync::{Arc, Mutex};

    const ADMIN: &str = "admin@club.test";
    const PASSWORD: &str = "secret";

    /// Photo store that keeps uploads in memory.
    #[derive(Clone, Default)]
    struct MemoryPhotos {
        uploads: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    }

    impl PhotoStore for MemoryPhotos {
        fn upload(&self, key: &str, bytes: &[u8]) -> anyhow::Result<String> {
            self.uploads
                .lock()
                .unwrap()
                .push((key.to_string(), bytes.to_vec()));
            Ok(format!("mem://{key}"))
        }
    }

    fn test_config() -> Config {
        Config {
            club: ClubConfig {
                name: "Test FC".into(),
                traits: vec!["portero".into(), "defensor".into(), "delantero".into()],
                bucket: "global".into(),
            },
            ranking: RankingConfig::default(),
            credentials: CredentialsConfig {
                admin_email: Some(ADMIN.into()),
                admin_password: Some(PASSWORD.into()),
            },
            ws_port: 9100,
            db_path: ":memory:".into(),
            photos: PhotoConfig {
                dir: "data/photos".into(),
                public_base_url: "/photos".into(),
            },
            ui: UiConfig {
                load_timeout_ms: 5000,
            },
        }
    }

    fn test_state_with_photos(photos: MemoryPhotos) -> AppState {
        let config = test_config();
        let db = Database::open(":memory:").unwrap();
        let sessions = SessionManager::new(Box::new(ConfigCredentials::from_config(
            &config.credentials,
        )));
        AppState::new(config, db, Box::new(photos), sessions)
    }

    fn test_state() -> AppState {
        test_state_with_photos(MemoryPhotos::default())
    }

    fn sign_in(state: &mut AppState) -> String {
        match state
            .handle_request(ClientRequest::SignIn {
                email: ADMIN.into(),
                password: PASSWORD.into(),
            })
            .unwrap()
        {
            ServerResponse::SignedIn { token, .. } => token,
            other => panic!("expected SignedIn, got {other:?}"),
        }
    }

    fn add_player(state: &mut AppState, token: &str, name: &str, traits: &[&str]) -> PlayerId {
        let response = state
            .handle_request(ClientRequest::AddPlayer {
                token: token.into(),
                name: name.into(),
                description: String::new(),
                traits: traits.iter().map(|t| t.to_string()).collect(),
                is_legendary: false,
                photo: None,
            })
            .unwrap();
        match response {
            ServerResponse::PlayerSaved { player_id } => player_id,
            other => panic!("expected PlayerSaved, got {other:?}"),
        }
    }

    fn record(state: &mut AppState, token: &str, id: &PlayerId, goals: i64, saves: i64) {
        state
            .handle_request(ClientRequest::RecordStat {
                token: token.into(),
                player_id: id.clone(),
                goals,
                assists: 0,
                clean_sheets: 0,
                saves,
                missed_goals: 0,
            })
            .unwrap();
    }

    #[test]
    fn wrong_password_yields_auth_error() {
        let mut state = test_state();
        let err = state
            .handle_request(ClientRequest::SignIn {
                email: ADMIN.into(),
                password: "wrong".into(),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert_eq!(err.to_string(), "invalid credentials");
    }

    #[test]
    fn mutation_without_session_is_refused() {
        let mut state = test_state();
        let err = state
            .handle_request(ClientRequest::DeleteStat {
                token: "nope".into(),
                stat_id: "1".into(),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[test]
    fn add_player_rejects_empty_name_and_unknown_trait() {
        let mut state = test_state();
        let token = sign_in(&mut state);

        let err = state
            .handle_request(ClientRequest::AddPlayer {
                token: token.clone(),
                name: "   ".into(),
                description: String::new(),
                traits: vec![],
                is_legendary: false,
                photo: None,
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = state
            .handle_request(ClientRequest::AddPlayer {
                token,
                name: "Ana".into(),
                description: String::new(),
                traits: vec!["mediocampista".into()],
                is_legendary: false,
                photo: None,
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("mediocampista"));
        assert_eq!(state.db.player_count().unwrap(), 0);
    }

    #[test]
    fn add_player_with_photo_uploads_and_stores_url() {
        let photos = MemoryPhotos::default();
        let mut state = test_state_with_photos(photos.clone());
        let token = sign_in(&mut state);

        let response = state
            .handle_request(ClientRequest::AddPlayer {
                token,
                name: "Ana".into(),
                description: "capitana".into(),
                traits: vec!["delantero".into()],
                is_legendary: false,
                photo: Some(PhotoUpload {
                    file_name: "ana.jpg".into(),
                    data_base64: "aGVsbG8=".into(),
                }),
            })
            .unwrap();
        let ServerResponse::PlayerSaved { player_id } = response else {
            panic!("expected PlayerSaved");
        };

        let uploads = photos.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert!(uploads[0].0.starts_with("players/"));
        assert!(uploads[0].0.ends_with("_ana.jpg"));
        assert_eq!(uploads[0].1, b"hello");

        let player = state.db.load_player(&player_id).unwrap().unwrap();
        assert_eq!(player.photo_url, format!("mem://{}", uploads[0].0));
    }

    #[test]
    fn invalid_base64_photo_is_validation_error() {
        let mut state = test_state();
        let token = sign_in(&mut state);
        let err = state
            .handle_request(ClientRequest::AddPlayer {
                token,
                name: "Ana".into(),
                description: String::new(),
                traits: vec![],
                is_legendary: false,
                photo: Some(PhotoUpload {
                    file_name: "ana.jpg".into(),
                    data_base64: "***".into(),
                }),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn record_stat_for_missing_player_is_not_found() {
        let mut state = test_state();
        let token = sign_in(&mut state);
        let err = state
            .handle_request(ClientRequest::RecordStat {
                token,
                player_id: PlayerId::new("ghost"),
                goals: 1,
                assists: 0,
                clean_sheets: 0,
                saves: 0,
                missed_goals: 0,
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn update_player_changes_fields_and_rejects_unknown_player() {
        let mut state = test_state();
        let token = sign_in(&mut state);
        let id = add_player(&mut state, &token, "Ana", &["delantero"]);

        state
            .handle_request(ClientRequest::UpdatePlayer {
                token: token.clone(),
                player_id: id.clone(),
                name: None,
                description: None,
                traits: None,
                is_legendary: Some(true),
                photo: None,
            })
            .unwrap();
        assert!(state.db.load_player(&id).unwrap().unwrap().is_legendary);

        let err = state
            .handle_request(ClientRequest::UpdatePlayer {
                token,
                player_id: PlayerId::new("ghost"),
                name: Some("X".into()),
                description: None,
                traits: None,
                is_legendary: None,
                photo: None,
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn delete_player_removes_their_stats() {
        let mut state = test_state();
        let token = sign_in(&mut state);
        let id = add_player(&mut state, &token, "Ana", &["delantero"]);
        record(&mut state, &token, &id, 2, 0);

        let response = state
            .handle_request(ClientRequest::DeletePlayer {
                token,
                player_id: id.clone(),
            })
            .unwrap();
        assert!(response.is_mutation());
        assert!(state.db.stats().unwrap().is_empty());
    }

    #[test]
    fn dashboard_ranks_keeper_by_saves() {
        let mut state = test_state();
        let token = sign_in(&mut state);
        let striker = add_player(&mut state, &token, "Ana", &["delantero"]);
        let keeper = add_player(&mut state, &token, "Bruno", &["portero"]);
        record(&mut state, &token, &striker, 4, 0);
        record(&mut state, &token, &keeper, 0, 7);
        // Second increment lands on the same record.
        record(&mut state, &token, &striker, 1, 0);

        let dashboard = state.build_dashboard().unwrap();
        assert_eq!(dashboard.club_name, "Test FC");
        assert_eq!(dashboard.player_count, 2);
        assert_eq!(dashboard.boards.len(), Metric::ALL.len());

        let points = dashboard.board(Metric::Points).unwrap();
        let order: Vec<(&str, i64)> = points
            .standings()
            .iter()
            .map(|s| (s.player.name(), s.player.total_points))
            .collect();
        assert_eq!(order, vec![("Ana", 10), ("Bruno", 7)]);
    }

    #[test]
    fn get_leaderboard_uses_requested_metric() {
        let mut state = test_state();
        let token = sign_in(&mut state);
        let a = add_player(&mut state, &token, "Ana", &["delantero"]);
        let b = add_player(&mut state, &token, "Bea", &["delantero"]);
        record(&mut state, &token, &a, 1, 0);
        record(&mut state, &token, &b, 3, 0);

        let response = state
            .handle_request(ClientRequest::GetLeaderboard {
                metric: Some(Metric::Goals),
            })
            .unwrap();
        let ServerResponse::Leaderboard(view) = response else {
            panic!("expected Leaderboard");
        };
        assert_eq!(view.metric, Metric::Goals);
        assert_eq!(view.label, "Goles");
        // Podium order is 2nd, 1st: Ana then Bea.
        let names: Vec<&str> = view.podium.iter().map(|s| s.player.name()).collect();
        assert_eq!(names, vec!["Ana", "Bea"]);
        assert!(view.remainder.is_empty());
    }

    #[test]
    fn malformed_message_becomes_validation_error() {
        let mut state = test_state();
        match state.handle_message("{not json") {
            ServerResponse::Error { kind, .. } => assert_eq!(kind, ErrorKind::Validation),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[test]
    fn sessions_survive_restart_through_store() {
        let mut state = test_state();
        let token = sign_in(&mut state);

        let mut restarted = SessionManager::new(Box::new(ConfigCredentials::from_config(
            &state.config.credentials,
        )));
        assert_eq!(restarted.init(&state.db).unwrap(), 1);
        assert!(restarted.is_admin(&token));

        state
            .handle_request(ClientRequest::SignOut {
                token: token.clone(),
            })
            .unwrap();
        assert_eq!(state.restore_sessions().unwrap(), 0);
    }

    #[tokio::test]
    async fn message_event_replies_and_pushes_dashboard_after_mutation() {
        let mut state = test_state();
        let token = sign_in(&mut state);
        let (ui_tx, mut ui_rx) = mpsc::channel(16);
        let (out_tx, mut out_rx) = mpsc::channel(16);

        handle_ws_event(
            &mut state,
            WsEvent::Connected {
                conn_id: 1,
                addr: "127.0.0.1:5000".into(),
                outbound: out_tx,
            },
            &ui_tx,
        )
        .await;
        assert_eq!(ui_rx.recv().await.unwrap(), UiUpdate::ClientCount(1));

        let text = serde_json::json!({"type": "ADD_PLAYER", "token": token, "name": "Ana"}).to_string();
        handle_ws_event(&mut state, WsEvent::Message { conn_id: 1, text }, &ui_tx).await;

        let reply: serde_json::Value = serde_json::from_str(&out_rx.recv().await.unwrap()).unwrap();
        assert_eq!(reply["type"], "PLAYER_SAVED");
        match ui_rx.recv().await.unwrap() {
            UiUpdate::Dashboard(d) => assert_eq!(d.player_count, 1),
            other => panic!("expected Dashboard, got {other:?}"),
        }

        // Reads do not push.
        let text = r#"{"type":"GET_PLAYERS"}"#.to_string();
        handle_ws_event(&mut state, WsEvent::Message { conn_id: 1, text }, &ui_tx).await;
        let reply: serde_json::Value = serde_json::from_str(&out_rx.recv().await.unwrap()).unwrap();
        assert_eq!(reply["type"], "PLAYERS");
        assert!(ui_rx.try_recv().is_err());

        handle_ws_event(&mut state, WsEvent::Disconnected { conn_id: 1 }, &ui_tx).await;
        assert_eq!(ui_rx.recv().await.unwrap(), UiUpdate::ClientCount(0));
        assert!(state.clients.is_empty());
    }

    #[tokio::test]
    async fn client_that_never_reads_is_dropped_instead_of_blocking() {
        let mut state = test_state();
        let (ui_tx, mut ui_rx) = mpsc::channel(16);
        let (stalled_tx, _stalled_rx) = mpsc::channel(1);
        let (live_tx, mut live_rx) = mpsc::channel(16);

        for (conn_id, outbound) in [(1, stalled_tx), (2, live_tx)] {
            handle_ws_event(
                &mut state,
                WsEvent::Connected {
                    conn_id,
                    addr: format!("127.0.0.1:{}", 5000 + conn_id),
                    outbound,
                },
                &ui_tx,
            )
            .await;
            ui_rx.recv().await.unwrap();
        }

        let ask = |conn_id| WsEvent::Message {
            conn_id,
            text: r#"{"type":"GET_PLAYERS"}"#.to_string(),
        };
        let stalled = async {
            handle_ws_event(&mut state, ask(1), &ui_tx).await;
            handle_ws_event(&mut state, ask(1), &ui_tx).await;
        };
        tokio::time::timeout(std::time::Duration::from_secs(2), stalled)
            .await
            .expect("a full client queue must not block the app loop");

        assert!(!state.clients.contains_key(&1));
        assert_eq!(ui_rx.recv().await.unwrap(), UiUpdate::ClientCount(1));

        // The other client is still served.
        handle_ws_event(&mut state, ask(2), &ui_tx).await;
        let reply: serde_json::Value = serde_json::from_str(&live_rx.recv().await.unwrap()).unwrap();
        assert_eq!(reply["type"], "PLAYERS");
    }

    #[test]
    fn record_stat_that_would_overflow_is_validation_error() {
        let mut state = test_state();
        let token = sign_in(&mut state);
        let id = add_player(&mut state, &token, "Ana", &["delantero"]);

        // Fits as a counter, but 2 * goals overflows the points.
        let err = state
            .handle_request(ClientRequest::RecordStat {
                token: token.clone(),
                player_id: id.clone(),
                goals: i64::MAX / 2 + 1,
                assists: 0,
                clean_sheets: 0,
                saves: 0,
                missed_goals: 0,
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(state.db.stats().unwrap().is_empty());

        // Counter overflow against an existing record.
        record(&mut state, &token, &id, 10, 0);
        let err = state
            .handle_request(ClientRequest::RecordStat {
                token: token.clone(),
                player_id: id.clone(),
                goals: i64::MAX,
                assists: 0,
                clean_sheets: 0,
                saves: 0,
                missed_goals: 0,
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        // Reads keep working.
        let dashboard = state.build_dashboard().unwrap();
        let points = dashboard.board(Metric::Points).unwrap();
        assert_eq!(points.standings()[0].player.total_points, 20);
    }

    #[test]
    fn keeper_points_only_count_saves_for_overflow() {
        let mut state = test_state();
        let token = sign_in(&mut state);
        let id = add_player(&mut state, &token, "Bruno", &["portero"]);

        // Goals never score for goalkeepers, so a large value still fits.
        record(&mut state, &token, &id, i64::MAX / 2 + 1, 3);
        let dashboard = state.build_dashboard().unwrap();
        let points = dashboard.board(Metric::Points).unwrap();
        assert_eq!(points.standings()[0].player.total_points, 3);
    }
}
