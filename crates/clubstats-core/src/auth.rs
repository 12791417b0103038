// Administrator authentication and session tokens.
//
// A `SessionManager` is created empty, restored from persistence with
// `init`, grows on `sign_in`, and shrinks on `sign_out`. Mutating entry
// points take the `AdminSession` returned by `authorize` as proof of access.

use std::collections::HashMap;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::CredentialsConfig;

const TOKEN_LEN: usize = 40;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("administrator session required")]
    Unauthorized,

    #[error("session persistence failed: {0}")]
    Store(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Source of truth for the administrator credential check.
pub trait CredentialStore: Send + Sync {
    /// Whether `email`/`password` identify the administrator.
    fn verify(&self, email: &str, password: &str) -> bool;

    /// The administrator email, if an administrator is configured.
    fn admin_email(&self) -> Option<&str>;
}

/// Single credential pair loaded from `credentials.toml`.
#[derive(Debug, Clone, Default)]
pub struct ConfigCredentials {
    email: Option<String>,
    password: Option<String>,
}

impl ConfigCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        ConfigCredentials {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    pub fn from_config(config: &CredentialsConfig) -> Self {
        ConfigCredentials {
            email: config.admin_email.clone(),
            password: config.admin_password.clone(),
        }
    }
}

impl CredentialStore for ConfigCredentials {
    fn verify(&self, email: &str, password: &str) -> bool {
        match (&self.email, &self.password) {
            (Some(e), Some(p)) => e == email && p == password,
            _ => false,
        }
    }

    fn admin_email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Proof that the holder signed in as administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSession {
    pub token: String,
    pub email: String,
    /// Sign-in time in epoch milliseconds.
    pub created_at: i64,
}

/// Where sessions survive restarts.
pub trait SessionStore {
    fn load_sessions(&self) -> anyhow::Result<Vec<AdminSession>>;
    fn save_sessions(&self, sessions: &[AdminSession]) -> anyhow::Result<()>;
}

pub struct SessionManager {
    credentials: Box<dyn CredentialStore>,
    sessions: HashMap<String, AdminSession>,
}

impl SessionManager {
    /// An empty manager. Call `init` to restore persisted sessions.
    pub fn new(credentials: Box<dyn CredentialStore>) -> Self {
        SessionManager {
            credentials,
            sessions: HashMap::new(),
        }
    }

    /// Restore persisted sessions. Sessions whose email no longer matches
    /// the configured administrator are dropped. Returns how many were kept.
    pub fn init(&mut self, store: &dyn SessionStore) -> Result<usize, AuthError> {
        let persisted = store.load_sessions()?;
        let total = persisted.len();
        let kept: HashMap<String, AdminSession> = persisted
            .into_iter()
            .filter(|s| self.is_admin_email(&s.email))
            .map(|s| (s.token.clone(), s))
            .collect();

        if kept.len() != total {
            warn!("Discarded {} stale admin session(s)", total - kept.len());
            persist(store, &kept)?;
        }
        self.sessions = kept;
        info!("Restored {} admin session(s)", self.sessions.len());
        Ok(self.sessions.len())
    }

    /// Check credentials and open a new session.
    pub fn sign_in(
        &mut self,
        store: &dyn SessionStore,
        email: &str,
        password: &str,
    ) -> Result<AdminSession, AuthError> {
        if !self.credentials.verify(email, password) {
            warn!("Rejected admin sign-in for {email}");
            return Err(AuthError::InvalidCredentials);
        }

        let session = AdminSession {
            token: generate_token(),
            email: email.to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
        };
        // Persist first so a failed write leaves no live token behind.
        let mut next = self.sessions.clone();
        next.insert(session.token.clone(), session.clone());
        persist(store, &next)?;
        self.sessions = next;
        info!("Admin {email} signed in");
        Ok(session)
    }

    /// Resolve `token` to a live administrator session.
    pub fn authorize(&self, token: &str) -> Result<&AdminSession, AuthError> {
        match self.sessions.get(token) {
            Some(session) if self.is_admin_email(&session.email) => Ok(session),
            _ => Err(AuthError::Unauthorized),
        }
    }

    pub fn is_admin(&self, token: &str) -> bool {
        self.authorize(token).is_ok()
    }

    /// End the session for `token`. Returns `false` if it was not open.
    pub fn sign_out(&mut self, store: &dyn SessionStore, token: &str) -> Result<bool, AuthError> {
        if !self.sessions.contains_key(token) {
            return Ok(false);
        }
        let mut next = self.sessions.clone();
        let session = next.remove(token);
        persist(store, &next)?;
        self.sessions = next;
        if let Some(session) = session {
            info!("Admin {} signed out", session.email);
        }
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn is_admin_email(&self, email: &str) -> bool {
        self.credentials.admin_email() == Some(email)
    }

}

/// Write `sessions` to `store`, oldest first.
fn persist(
    store: &dyn SessionStore,
    sessions: &HashMap<String, AdminSession>,
) -> Result<(), AuthError> {
    let mut sessions: Vec<AdminSession> = sessions.values().cloned().collect();
    sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.token.cmp(&b.token)));
    store.save_sessions(&sessions)?;
    Ok(())
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
