// Message types: WebSocket wire protocol and the app <-> TUI channels.

use serde::{Deserialize, Serialize};

use clubstats_core::model::{AggregatedPlayer, PlayerId, StatLine, StatRecord};
use clubstats_core::ranking::{Leaderboard, Metric, Standing};

// ---------------------------------------------------------------------------
// Client -> server
// ---------------------------------------------------------------------------

/// A photo sent inline with a player write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoUpload {
    pub file_name: String,
    pub data_base64: String,
}

/// Requests accepted over the WebSocket, tagged by `type`.
///
/// Every mutating request carries the session `token` returned by `SIGN_IN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientRequest {
    GetLeaderboard {
        /// Falls back to the configured default metric.
        #[serde(default)]
        metric: Option<Metric>,
    },
    GetPlayers,
    SignIn {
        email: String,
        password: String,
    },
    SignOut {
        token: String,
    },
    AddPlayer {
        token: String,
        name: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        traits: Vec<String>,
        #[serde(default)]
        is_legendary: bool,
        #[serde(default)]
        photo: Option<PhotoUpload>,
    },
    UpdatePlayer {
        token: String,
        player_id: PlayerId,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        traits: Option<Vec<String>>,
        #[serde(default)]
        is_legendary: Option<bool>,
        #[serde(default)]
        photo: Option<PhotoUpload>,
    },
    DeletePlayer {
        token: String,
        player_id: PlayerId,
    },
    RecordStat {
        token: String,
        player_id: PlayerId,
        #[serde(default)]
        goals: i64,
        #[serde(default)]
        assists: i64,
        #[serde(default)]
        clean_sheets: i64,
        #[serde(default)]
        saves: i64,
        #[serde(default)]
        missed_goals: i64,
    },
    DeleteStat {
        token: String,
        stat_id: String,
    },
}

impl ClientRequest {
    /// Short name for logging; never includes credentials.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientRequest::GetLeaderboard { .. } => "GET_LEADERBOARD",
            ClientRequest::GetPlayers => "GET_PLAYERS",
            ClientRequest::SignIn { .. } => "SIGN_IN",
            ClientRequest::SignOut { .. } => "SIGN_OUT",
            ClientRequest::AddPlayer { .. } => "ADD_PLAYER",
            ClientRequest::UpdatePlayer { .. } => "UPDATE_PLAYER",
            ClientRequest::DeletePlayer { .. } => "DELETE_PLAYER",
            ClientRequest::RecordStat { .. } => "RECORD_STAT",
            ClientRequest::DeleteStat { .. } => "DELETE_STAT",
        }
    }

    /// The increment carried by a `RECORD_STAT` request.
    pub fn stat_line(&self) -> Option<StatLine> {
        match *self {
            ClientRequest::RecordStat {
                goals,
                assists,
                clean_sheets,
                saves,
                missed_goals,
                ..
            } => Some(StatLine {
                goals,
                assists,
                clean_sheets,
                saves,
                missed_goals,
            }),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Server -> client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Auth,
    NotFound,
    DataAccess,
}

/// A leaderboard split the way the dashboard shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardView {
    pub metric: Metric,
    pub label: String,
    /// Ranks 1-3 in display order: 2nd, 1st, 3rd.
    pub podium: Vec<Standing>,
    /// Ranks 4..N.
    pub remainder: Vec<Standing>,
}

impl From<&Leaderboard> for LeaderboardView {
    fn from(board: &Leaderboard) -> Self {
        LeaderboardView {
            metric: board.metric,
            label: board.metric.label().to_string(),
            podium: board.podium().into_iter().cloned().collect(),
            remainder: board.remainder().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerResponse {
    Leaderboard(LeaderboardView),
    Players {
        players: Vec<AggregatedPlayer>,
    },
    SignedIn {
        token: String,
        email: String,
    },
    SignedOut,
    PlayerSaved {
        player_id: PlayerId,
    },
    PlayerDeleted {
        player_id: PlayerId,
    },
    StatRecorded {
        stat: StatRecord,
    },
    StatDeleted {
        stat_id: String,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl ServerResponse {
    /// Whether this response reports a change to players or stats.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            ServerResponse::PlayerSaved { .. }
                | ServerResponse::PlayerDeleted { .. }
                | ServerResponse::StatRecorded { .. }
                | ServerResponse::StatDeleted { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// App <-> TUI
// ---------------------------------------------------------------------------

/// Everything the dashboard needs for one frame of data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    pub club_name: String,
    pub player_count: usize,
    /// One board per metric, in `Metric::ALL` order.
    pub boards: Vec<Leaderboard>,
}

impl Dashboard {
    pub fn board(&self, metric: Metric) -> Option<&Leaderboard> {
        self.boards.iter().find(|b| b.metric == metric)
    }
}

/// Updates pushed from the app loop to the TUI.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Dashboard(Box<Dashboard>),
    ClientCount(usize),
    LoadFailed(String),
}

/// Commands sent from the TUI to the app loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    Refresh,
    Quit,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_get_leaderboard_with_and_without_metric() {
        let req: ClientRequest =
            serde_json::from_str(r#"{"type":"GET_LEADERBOARD","metric":"missedGoals"}"#).unwrap();
        assert_eq!(
            req,
            ClientRequest::GetLeaderboard {
                metric: Some(Metric::MissedGoals)
            }
        );

        let req: ClientRequest = serde_json::from_str(r#"{"type":"GET_LEADERBOARD"}"#).unwrap();
        assert_eq!(req, ClientRequest::GetLeaderboard { metric: None });
    }

    #[test]
    fn parses_add_player_with_optional_fields_missing() {
        let req: ClientRequest = serde_json::from_value(json!({
            "type": "ADD_PLAYER",
            "token": "t",
            "name": "Ana"
        }))
        .unwrap();
        match req {
            ClientRequest::AddPlayer {
                name,
                traits,
                is_legendary,
                photo,
                ..
            } => {
                assert_eq!(name, "Ana");
                assert!(traits.is_empty());
                assert!(!is_legendary);
                assert!(photo.is_none());
            }
            other => panic!("expected AddPlayer, got {other:?}"),
        }
    }

    #[test]
    fn record_stat_missing_counters_default_to_zero() {
        let req: ClientRequest = serde_json::from_value(json!({
            "type": "RECORD_STAT",
            "token": "t",
            "player_id": "p_1_0",
            "goals": 2,
            "assists": 1
        }))
        .unwrap();
        assert_eq!(req.kind(), "RECORD_STAT");
        assert_eq!(
            req.stat_line(),
            Some(StatLine {
                goals: 2,
                assists: 1,
                ..Default::default()
            })
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result: Result<ClientRequest, _> = serde_json::from_str(r#"{"type":"DROP_TABLES"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn error_response_wire_shape() {
        let resp = ServerResponse::Error {
            kind: ErrorKind::NotFound,
            message: "player not found".into(),
        };
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"type": "ERROR", "kind": "not_found", "message": "player not found"})
        );
        assert!(!resp.is_mutation());
    }

    #[test]
    fn unit_and_struct_responses_are_tagged() {
        assert_eq!(
            serde_json::to_value(ServerResponse::SignedOut).unwrap(),
            json!({"type": "SIGNED_OUT"})
        );
        let saved = ServerResponse::PlayerSaved {
            player_id: PlayerId::new("p_1_0"),
        };
        assert_eq!(
            serde_json::to_value(&saved).unwrap(),
            json!({"type": "PLAYER_SAVED", "player_id": "p_1_0"})
        );
        assert!(saved.is_mutation());
    }
}
