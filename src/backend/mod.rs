//! Remote backend clients.
//!
//! The store only needs four capabilities from a backend: upsert one row per
//! content kind, read all rows, follow a change feed, and store images.

mod blobs;
mod offline;
mod rest;
mod sqlite;

pub use blobs::*;
pub use offline::*;
pub use rest::*;
pub use sqlite::*;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{BackendConfig, Config};
use crate::errors::AppError;
use crate::models::{ChangeEvent, ContentKind, ContentRow};

/// Which kind of backend is serving the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    Rest,
    Sqlite,
    Offline,
}

/// Binary object kept by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[async_trait]
pub trait RemoteBackend: Send + Sync {
    fn mode(&self) -> BackendMode;

    /// Insert or replace the single row for `row.kind`.
    async fn upsert(&self, row: &ContentRow) -> Result<(), AppError>;

    /// Current rows for all kinds, newest first.
    async fn query_all(&self) -> Result<Vec<ContentRow>, AppError>;

    /// Follow row inserts and updates. Delivery is at-least-once and includes
    /// changes caused by this process.
    async fn subscribe(&self) -> Result<Subscription, AppError>;

    /// Store binary data and return a durable URL for it.
    async fn upload_blob(
        &self,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<String, AppError>;

    /// Serve a blob this backend stores itself. Hosted backends serve their own URLs.
    async fn fetch_blob(&self, _id: &str) -> Result<Option<Blob>, AppError> {
        Ok(None)
    }
}

/// Open change feed. Dropping it stops the worker feeding it.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    worker: JoinHandle<()>,
}

impl Subscription {
    pub fn new(events: mpsc::UnboundedReceiver<ChangeEvent>, worker: JoinHandle<()>) -> Self {
        Self { events, worker }
    }

    /// Next change, or `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

/// Build the backend selected by configuration.
pub async fn connect(config: &Config) -> Arc<dyn RemoteBackend> {
    match &config.backend {
        BackendConfig::Rest { url, key, bucket } => {
            match RestBackend::new(url, key, bucket, config.poll_interval) {
                Ok(backend) => {
                    tracing::info!("Using hosted backend at {}", url);
                    Arc::new(backend)
                }
                Err(e) => {
                    tracing::warn!("Failed to build HTTP client ({}); running offline", e);
                    Arc::new(OfflineBackend)
                }
            }
        }
        BackendConfig::Sqlite { path } => match SqliteBackend::open(path).await {
            Ok(backend) => {
                tracing::info!("Using SQLite backend at {:?}", path);
                Arc::new(backend)
            }
            Err(e) => {
                tracing::warn!("Failed to open SQLite backend ({}); running offline", e);
                Arc::new(OfflineBackend)
            }
        },
        BackendConfig::Offline => {
            tracing::info!("No backend configured; running offline with built-in content");
            Arc::new(OfflineBackend)
        }
    }
}

/// Row as stored remotely, before the kind name is checked.
#[derive(Debug, Deserialize)]
pub(crate) struct RawRow {
    pub content_type: String,
    pub content: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl RawRow {
    /// Rows for kinds this service does not know are skipped.
    pub(crate) fn into_row(self) -> Option<ContentRow> {
        match ContentKind::parse(&self.content_type) {
            Some(kind) => Some(ContentRow {
                kind,
                content: self.content,
                updated_at: self.updated_at,
            }),
            None => {
                tracing::debug!("Ignoring row for unknown content type {}", self.content_type);
                None
            }
        }
    }
}

/// Newest first, as every backend must return rows.
pub(crate) fn sort_newest_first(rows: &mut [ContentRow]) {
    rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}
