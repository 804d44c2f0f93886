//! Local persisted cache.
//!
//! Holds the two values that survive a restart: the theme preference and the
//! admin session marker. Content is never stored here.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::errors::AppError;

/// Marker of a signed-in admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSession {
    pub username: String,
    pub token: String,
    pub issued_at: DateTime<Utc>,
}

/// On-disk layout of the cache file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheData {
    #[serde(default = "default_dark_mode")]
    pub dark_mode: bool,
    #[serde(default)]
    pub session: Option<AdminSession>,
}

fn default_dark_mode() -> bool {
    true
}

impl Default for CacheData {
    fn default() -> Self {
        Self {
            dark_mode: default_dark_mode(),
            session: None,
        }
    }
}

pub struct LocalCache {
    path: PathBuf,
    data: RwLock<CacheData>,
}

impl LocalCache {
    /// Read the cache file. A missing or unreadable file yields defaults.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<CacheData>(&bytes) {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!("Cache file {:?} is corrupt, starting fresh: {}", path, e);
                    CacheData::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CacheData::default(),
            Err(e) => {
                tracing::warn!("Failed to read cache file {:?}: {}", path, e);
                CacheData::default()
            }
        };

        Self {
            path,
            data: RwLock::new(data),
        }
    }

    pub async fn dark_mode(&self) -> bool {
        self.data.read().await.dark_mode
    }

    pub async fn set_dark_mode(&self, dark_mode: bool) -> Result<(), AppError> {
        let mut data = self.data.write().await;
        data.dark_mode = dark_mode;
        self.save(&data).await
    }

    pub async fn session(&self) -> Option<AdminSession> {
        self.data.read().await.session.clone()
    }

    pub async fn set_session(&self, session: Option<AdminSession>) -> Result<(), AppError> {
        let mut data = self.data.write().await;
        data.session = session;
        self.save(&data).await
    }

    /// Write to a sibling temp file, then rename over the cache file.
    async fn save(&self, data: &CacheData) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(data)
            .map_err(|e| AppError::Internal(format!("Failed to encode cache: {}", e)))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!("Saved local cache to {:?}", self.path);
        Ok(())
    }
}
