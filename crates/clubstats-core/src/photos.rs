// Player photo storage.

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

/// Blob storage for player photos.
pub trait PhotoStore: Send + Sync {
    /// Store `bytes` under `key` and return a public URL for it.
    fn upload(&self, key: &str, bytes: &[u8]) -> Result<String>;
}

/// Storage key for an uploaded photo: `players/<millis>_<file name>`.
///
/// Directory parts of `file_name` are dropped and characters outside
/// `[A-Za-z0-9._-]` become `_`.
pub fn photo_key(now: DateTime<Utc>, file_name: &str) -> String {
    let base = file_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name);
    let clean: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("players/{}_{}", now.timestamp_millis(), clean)
}

/// Writes photos below a root directory and serves them from a base URL.
///
/// Replacing a player's photo uploads a new file; the old one is kept.
#[derive(Debug, Clone)]
pub struct LocalPhotoStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalPhotoStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        LocalPhotoStore {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), key)
    }
}

impl PhotoStore for LocalPhotoStore {
    fn upload(&self, key: &str, bytes: &[u8]) -> Result<String> {
        let relative = Path::new(key);
        if key.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            bail!("invalid photo key: {key:?}");
        }

        let target = self.root.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(&target, bytes)
            .with_context(|| format!("failed to write photo {}", target.display()))?;

        info!("Stored photo {} ({} bytes)", key, bytes.len());
        Ok(self.url_for(key))
    }
}
