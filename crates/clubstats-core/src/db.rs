// SQLite persistence layer for players, stat records, and admin sessions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::auth::{AdminSession, SessionStore};
use crate::model::{Player, PlayerId, StatLine, StatRecord};
use crate::store::{NewPlayer, PlayerStore, PlayerUpdate, SnapshotProvider};

const PLAYER_COLUMNS: &str = "id, name, description, traits, is_legendary, photo_url, created_at";
const STAT_COLUMNS: &str =
    "id, player_id, month, goals, assists, clean_sheets, saves, missed_goals, created_at";

/// SQLite-backed store for players, their stat records, and key-value state.
pub struct Database {
    conn: Mutex<Connection>,
    id_seq: AtomicU64,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS players (
                id           TEXT PRIMARY KEY,
                name         TEXT NOT NULL,
                description  TEXT NOT NULL DEFAULT '',
                traits       TEXT NOT NULL DEFAULT '[]',
                is_legendary INTEGER NOT NULL DEFAULT 0,
                photo_url    TEXT NOT NULL DEFAULT '',
                created_at   INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS stats (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                player_id    TEXT NOT NULL REFERENCES players(id) ON DELETE CASCADE,
                month        TEXT NOT NULL,
                goals        INTEGER NOT NULL DEFAULT 0,
                assists      INTEGER NOT NULL DEFAULT 0,
                clean_sheets INTEGER NOT NULL DEFAULT 0,
                saves        INTEGER NOT NULL DEFAULT 0,
                missed_goals INTEGER NOT NULL DEFAULT 0,
                created_at   INTEGER NOT NULL,
                UNIQUE(player_id, month)
            );

            CREATE TABLE IF NOT EXISTS kv_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
            id_seq: AtomicU64::new(0),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// New player id: `p_<millis>_<seq>`. The sequence keeps ids unique
    /// when several players are created within the same millisecond.
    fn next_player_id(&self, now_ms: i64) -> PlayerId {
        let seq = self.id_seq.fetch_add(1, Ordering::Relaxed);
        PlayerId::new(format!("p_{now_ms}_{seq}"))
    }

    // ------------------------------------------------------------------
    // Key-value state
    // ------------------------------------------------------------------

    /// Persist an arbitrary JSON value under `key`. Repeated saves overwrite
    /// the previous value.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn();
        let json_str = serde_json::to_string(value).context("failed to serialize state value")?;
        conn.execute(
            "INSERT OR REPLACE INTO kv_state (key, value) VALUES (?1, ?2)",
            params![key, json_str],
        )
        .context("failed to save state")?;
        Ok(())
    }

    /// Load a previously saved JSON value by `key`. Returns `None` if the key
    /// does not exist.
    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let json_str: Option<String> = conn
            .query_row(
                "SELECT value FROM kv_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query state")?;

        match json_str {
            Some(s) => {
                let value = serde_json::from_str(&s).context("failed to deserialize state value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub fn delete_state(&self, key: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM kv_state WHERE key = ?1", params![key])
            .context("failed to delete state")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Look up a single player by id.
    pub fn load_player(&self, id: &PlayerId) -> Result<Option<Player>> {
        let conn = self.conn();
        let sql = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?1");
        let row = conn
            .query_row(&sql, params![id.as_str()], player_row)
            .optional()
            .context("failed to query player")?;
        row.map(PlayerRow::into_player).transpose()
    }

    pub fn player_exists(&self, id: &PlayerId) -> Result<bool> {
        let conn = self.conn();
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM players WHERE id = ?1)",
                params![id.as_str()],
                |row| row.get(0),
            )
            .context("failed to check player existence")?;
        Ok(exists)
    }

    /// The `(player, bucket)` record, if one has been written.
    pub fn load_stat(&self, player_id: &PlayerId, bucket: &str) -> Result<Option<StatRecord>> {
        let conn = self.conn();
        select_stat(&conn, player_id, bucket)
    }

    pub fn player_count(&self) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))
            .context("failed to count players")?;
        Ok(count as usize)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Raw player columns; `traits` is still JSON text.
struct PlayerRow {
    id: String,
    name: String,
    description: String,
    traits_json: String,
    is_legendary: bool,
    photo_url: String,
    created_at: i64,
}

impl PlayerRow {
    fn into_player(self) -> Result<Player> {
        let traits: Vec<String> = serde_json::from_str(&self.traits_json)
            .with_context(|| format!("corrupt traits for player {}", self.id))?;
        Ok(Player {
            id: PlayerId::new(self.id),
            name: self.name,
            traits,
            is_legendary: self.is_legendary,
            description: self.description,
            photo_url: self.photo_url,
            created_at: self.created_at,
        })
    }
}

fn player_row(row: &Row<'_>) -> rusqlite::Result<PlayerRow> {
    Ok(PlayerRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        traits_json: row.get(3)?,
        is_legendary: row.get(4)?,
        photo_url: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn stat_row(row: &Row<'_>) -> rusqlite::Result<StatRecord> {
    let id: i64 = row.get(0)?;
    let player_id: String = row.get(1)?;
    Ok(StatRecord {
        id: id.to_string(),
        player_id: PlayerId::new(player_id),
        month: row.get(2)?,
        line: StatLine {
            goals: row.get(3)?,
            assists: row.get(4)?,
            clean_sheets: row.get(5)?,
            saves: row.get(6)?,
            missed_goals: row.get(7)?,
        },
        created_at: row.get(8)?,
    })
}

fn select_stat(conn: &Connection, player_id: &PlayerId, bucket: &str) -> Result<Option<StatRecord>> {
    let sql = format!("SELECT {STAT_COLUMNS} FROM stats WHERE player_id = ?1 AND month = ?2");
    conn.query_row(&sql, params![player_id.as_str(), bucket], stat_row)
        .optional()
        .context("failed to query stat record")
}

// ---------------------------------------------------------------------------
// Store trait implementations
// ---------------------------------------------------------------------------

impl SnapshotProvider for Database {
    fn players(&self) -> Result<Vec<Player>> {
        let conn = self.conn();
        let sql = format!("SELECT {PLAYER_COLUMNS} FROM players ORDER BY created_at, id");
        let mut stmt = conn
            .prepare(&sql)
            .context("failed to prepare players query")?;
        let rows = stmt
            .query_map([], player_row)
            .context("failed to query players")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map player rows")?;
        rows.into_iter().map(PlayerRow::into_player).collect()
    }

    fn stats(&self) -> Result<Vec<StatRecord>> {
        let conn = self.conn();
        let sql = format!("SELECT {STAT_COLUMNS} FROM stats ORDER BY id");
        let mut stmt = conn.prepare(&sql).context("failed to prepare stats query")?;
        let stats = stmt
            .query_map([], stat_row)
            .context("failed to query stats")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map stat rows")?;
        Ok(stats)
    }
}

impl PlayerStore for Database {
    fn create_player(&self, player: &NewPlayer) -> Result<PlayerId> {
        let now = chrono::Utc::now().timestamp_millis();
        let id = self.next_player_id(now);
        let traits_json =
            serde_json::to_string(&player.traits).context("failed to serialize traits")?;

        let conn = self.conn();
        conn.execute(
            "INSERT INTO players (id, name, description, traits, is_legendary, photo_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.as_str(),
                player.name,
                player.description,
                traits_json,
                player.is_legendary,
                player.photo_url,
                now,
            ],
        )
        .context("failed to insert player")?;
        Ok(id)
    }

    fn update_player(&self, id: &PlayerId, update: &PlayerUpdate) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;

        let sql = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?1");
        let Some(row) = tx
            .query_row(&sql, params![id.as_str()], player_row)
            .optional()
            .context("failed to query player for update")?
        else {
            return Ok(false);
        };

        let mut player = row.into_player()?;
        update.apply_to(&mut player);
        let traits_json =
            serde_json::to_string(&player.traits).context("failed to serialize traits")?;

        tx.execute(
            "UPDATE players
                SET name = ?2, description = ?3, traits = ?4, is_legendary = ?5, photo_url = ?6
              WHERE id = ?1",
            params![
                id.as_str(),
                player.name,
                player.description,
                traits_json,
                player.is_legendary,
                player.photo_url,
            ],
        )
        .context("failed to update player")?;
        tx.commit().context("failed to commit update_player")?;
        Ok(true)
    }

    fn delete_player(&self, id: &PlayerId) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        tx.execute("DELETE FROM stats WHERE player_id = ?1", params![id.as_str()])
            .context("failed to delete player stats")?;
        let removed = tx
            .execute("DELETE FROM players WHERE id = ?1", params![id.as_str()])
            .context("failed to delete player")?;
        tx.commit().context("failed to commit delete_player")?;
        Ok(removed > 0)
    }

    fn record_stat(&self, player_id: &PlayerId, bucket: &str, line: &StatLine) -> Result<StatRecord> {
        let now = chrono::Utc::now().timestamp_millis();
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;

        // Overflowing integers turn into REAL inside SQLite, so the sum is
        // checked here and nothing is written when it does not fit.
        let existing = select_stat(&tx, player_id, bucket)?;
        let current = existing.map(|r| r.line).unwrap_or_default();
        if current.checked_add(line).is_none() {
            bail!("stat increment for player {player_id} overflows the stored totals");
        }

        let sql = format!(
            "INSERT INTO stats (player_id, month, goals, assists, clean_sheets, saves, missed_goals, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(player_id, month) DO UPDATE SET
                goals        = goals + excluded.goals,
                assists      = assists + excluded.assists,
                clean_sheets = clean_sheets + excluded.clean_sheets,
                saves        = saves + excluded.saves,
                missed_goals = missed_goals + excluded.missed_goals
             RETURNING {STAT_COLUMNS}"
        );
        let record = tx
            .query_row(
                &sql,
                params![
                    player_id.as_str(),
                    bucket,
                    line.goals,
                    line.assists,
                    line.clean_sheets,
                    line.saves,
                    line.missed_goals,
                    now,
                ],
                stat_row,
            )
            .with_context(|| format!("failed to record stat for player {player_id}"))?;
        tx.commit().context("failed to commit record_stat")?;
        Ok(record)
    }

    fn delete_stat(&self, stat_id: &str) -> Result<bool> {
        // Ids are rendered from the integer row id; anything else cannot match.
        let Ok(row_id) = stat_id.parse::<i64>() else {
            return Ok(false);
        };
        let conn = self.conn();
        let removed = conn
            .execute("DELETE FROM stats WHERE id = ?1", params![row_id])
            .context("failed to delete stat")?;
        Ok(removed > 0)
    }
}

impl SessionStore for Database {
    fn load_sessions(&self) -> Result<Vec<AdminSession>> {
        match self.load_state(Database::SESSIONS_KEY)? {
            Some(value) => {
                serde_json::from_value(value).context("failed to deserialize admin sessions")
            }
            None => Ok(Vec::new()),
        }
    }

    fn save_sessions(&self, sessions: &[AdminSession]) -> Result<()> {
        if sessions.is_empty() {
            return self.delete_state(Database::SESSIONS_KEY);
        }
        let value = serde_json::to_value(sessions).context("failed to serialize admin sessions")?;
        self.save_state(Database::SESSIONS_KEY, &value)
    }
}

impl Database {
    /// Key in `kv_state` holding the open admin sessions.
    const SESSIONS_KEY: &'static str = "admin_sessions";
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
