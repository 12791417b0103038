// Configuration loading and parsing (club.toml, server.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::{GLOBAL_BUCKET, GOALKEEPER_TRAIT};
use crate::ranking::{LegendaryPolicy, Metric, RankingOptions, TieBreak};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub club: ClubConfig,
    pub ranking: RankingConfig,
    pub credentials: CredentialsConfig,
    pub ws_port: u16,
    pub db_path: String,
    pub photos: PhotoConfig,
    pub ui: UiConfig,
}

// ---------------------------------------------------------------------------
// club.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for club.toml.
#[derive(Debug, Clone, Deserialize)]
struct ClubFile {
    club: ClubConfig,
    #[serde(default)]
    ranking: RankingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClubConfig {
    pub name: String,
    /// Allowed player trait tags.
    pub traits: Vec<String>,
    /// Stat bucket new records are written to and leaderboards read from.
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

fn default_bucket() -> String {
    GLOBAL_BUCKET.to_string()
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RankingConfig {
    #[serde(default)]
    pub legendary: LegendaryPolicy,
    #[serde(default)]
    pub tie_break: TieBreak,
    /// Tab the dashboard opens on.
    #[serde(default)]
    pub default_metric: Metric,
}

impl RankingConfig {
    pub fn options(&self) -> RankingOptions {
        RankingOptions {
            legendary: self.legendary,
            tie_break: self.tie_break,
        }
    }
}

// ---------------------------------------------------------------------------
// server.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for server.toml.
#[derive(Debug, Clone, Deserialize)]
struct ServerFile {
    websocket: WebsocketSection,
    database: DatabaseSection,
    photos: PhotoConfig,
    ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct WebsocketSection {
    port: u16,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoConfig {
    pub dir: String,
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    /// How long the dashboard shows its loading state before giving up.
    pub load_timeout_ms: u64,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/club.toml`,
/// `config/server.toml`, and (optionally) `config/credentials.toml`,
/// all relative to the given `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- club.toml (required) ---
    let club_path = config_dir.join("club.toml");
    let club_text = read_file(&club_path)?;
    let club_file: ClubFile = toml::from_str(&club_text).map_err(|e| ConfigError::ParseError {
        path: club_path.clone(),
        source: e,
    })?;

    // --- server.toml (required) ---
    let server_path = config_dir.join("server.toml");
    let server_text = read_file(&server_path)?;
    let server_file: ServerFile =
        toml::from_str(&server_text).map_err(|e| ConfigError::ParseError {
            path: server_path.clone(),
            source: e,
        })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        club: club_file.club,
        ranking: club_file.ranking,
        credentials,
        ws_port: server_file.websocket.port,
        db_path: server_file.database.path,
        photos: server_file.photos,
        ui: server_file.ui,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the app directory or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // Keep the user's copy.
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Loads config relative to the current working directory, copying
/// defaults into `config/` first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.club.name.trim().is_empty() {
        return Err(invalid("club.name", "must not be empty"));
    }

    if config.club.bucket.trim().is_empty() {
        return Err(invalid("club.bucket", "must not be empty"));
    }

    let traits = &config.club.traits;
    if let Some(blank) = traits.iter().find(|t| t.trim().is_empty()) {
        return Err(invalid("club.traits", format!("contains blank tag {blank:?}")));
    }
    if !traits.iter().any(|t| t == GOALKEEPER_TRAIT) {
        return Err(invalid(
            "club.traits",
            format!("must include the goalkeeper tag \"{GOALKEEPER_TRAIT}\""),
        ));
    }
    for (i, tag) in traits.iter().enumerate() {
        if traits[..i].contains(tag) {
            return Err(invalid("club.traits", format!("duplicate tag \"{tag}\"")));
        }
    }

    if config.ws_port == 0 {
        return Err(invalid("websocket.port", "must be greater than 0"));
    }

    if config.db_path.trim().is_empty() {
        return Err(invalid("database.path", "must not be empty"));
    }

    if config.photos.dir.trim().is_empty() {
        return Err(invalid("photos.dir", "must not be empty"));
    }

    if config.ui.load_timeout_ms == 0 {
        return Err(invalid("ui.load_timeout_ms", "must be greater than 0"));
    }

    let creds = &config.credentials;
    if creds.admin_email.is_some() != creds.admin_password.is_some() {
        return Err(invalid(
            "credentials",
            "admin_email and admin_password must be set together",
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
