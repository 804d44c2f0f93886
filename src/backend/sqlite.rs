//! Self-hosted backend on SQLite.
//!
//! Keeps one row per content kind and publishes every upsert on an in-process
//! broadcast channel, which serves as the change feed.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tokio::sync::{broadcast, mpsc};

use super::{sort_newest_first, BackendMode, Blob, RawRow, RemoteBackend, Subscription};
use crate::errors::AppError;
use crate::models::{ChangeEvent, ChangeType, ContentRow};

const CHANGE_FEED_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
    changes: broadcast::Sender<ChangeEvent>,
}

impl SqliteBackend {
    /// Open (creating if needed) the database file and run migrations.
    pub async fn open(db_path: &Path) -> Result<Self, AppError> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!("Failed to create database directory {:?}: {}", parent, e);
            }
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        run_migrations(&pool).await?;

        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Ok(Self { pool, changes })
    }
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS portfolio_content (
            content_type TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blobs (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            content_type TEXT NOT NULL,
            data BLOB NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_content_updated_at ON portfolio_content(updated_at);",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl RemoteBackend for SqliteBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Sqlite
    }

    async fn upsert(&self, row: &ContentRow) -> Result<(), AppError> {
        let content = serde_json::to_string(&row.content)?;
        let mut tx = self.pool.begin().await?;

        let existing: Option<String> =
            sqlx::query_scalar("SELECT updated_at FROM portfolio_content WHERE content_type = ?")
                .bind(row.kind.as_str())
                .fetch_optional(&mut *tx)
                .await?;

        // Last write wins by timestamp; an older row never replaces a newer one.
        let stored_newer = existing
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .is_some_and(|ts| ts.with_timezone(&Utc) >= row.updated_at);
        if stored_newer {
            tx.rollback().await?;
            tracing::debug!("Not overwriting newer {} row with {}", row.kind, row.updated_at);
            return Ok(());
        }

        sqlx::query(
            r#"INSERT INTO portfolio_content (content_type, content, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(content_type) DO UPDATE SET
                content = excluded.content,
                updated_at = excluded.updated_at"#,
        )
        .bind(row.kind.as_str())
        .bind(&content)
        .bind(format_timestamp(&row.updated_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let event_type = if existing.is_some() {
            ChangeType::Update
        } else {
            ChangeType::Insert
        };
        // No receivers just means nobody is subscribed yet.
        let _ = self
            .changes
            .send(ChangeEvent::from_row(row.clone(), event_type));
        Ok(())
    }

    async fn query_all(&self) -> Result<Vec<ContentRow>, AppError> {
        let rows = sqlx::query(
            "SELECT content_type, content, updated_at FROM portfolio_content ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let content_type: String = row.get("content_type");
            let content: String = row.get("content");
            let updated_at: String = row.get("updated_at");

            let parsed = serde_json::from_str(&content)
                .ok()
                .zip(DateTime::parse_from_rfc3339(&updated_at).ok());
            let Some((content, updated_at)) = parsed else {
                tracing::warn!("Skipping unreadable row for {}", content_type);
                continue;
            };

            let raw = RawRow {
                content_type,
                content,
                updated_at: updated_at.with_timezone(&Utc),
            };
            if let Some(row) = raw.into_row() {
                result.push(row);
            }
        }

        sort_newest_first(&mut result);
        Ok(result)
    }

    async fn subscribe(&self) -> Result<Subscription, AppError> {
        let mut changes = self.changes.subscribe();
        let (tx, rx) = mpsc::unbounded_channel();

        let worker = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Change feed lagged; {} events skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription::new(rx, worker))
    }

    async fn upload_blob(
        &self,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<String, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO blobs (id, name, content_type, data, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(content_type)
        .bind(&data)
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(format!("/api/blobs/{}", id))
    }

    async fn fetch_blob(&self, id: &str) -> Result<Option<Blob>, AppError> {
        let row = sqlx::query("SELECT name, content_type, data FROM blobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Blob {
            name: row.get("name"),
            content_type: row.get("content_type"),
            data: row.get("data"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentKind;
    use chrono::Duration;
    use serde_json::json;
    use tempfile::TempDir;

    async fn open_temp() -> (SqliteBackend, TempDir) {
        let dir = TempDir::new().unwrap();
        let backend = SqliteBackend::open(&dir.path().join("content.sqlite"))
            .await
            .unwrap();
        (backend, dir)
    }

    fn row(kind: ContentKind, content: serde_json::Value, ts: DateTime<Utc>) -> ContentRow {
        ContentRow {
            kind,
            content,
            updated_at: ts,
        }
    }

    #[tokio::test]
    async fn test_open_creates_missing_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("nested").join("content.sqlite");

        let backend = SqliteBackend::open(&path).await.unwrap();

        assert!(path.exists());
        assert!(backend.query_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_under_a_file_reports_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let result = SqliteBackend::open(&blocker.join("content.sqlite")).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_upsert_replaces_single_row_per_kind() {
        let (backend, _dir) = open_temp().await;
        let t0 = Utc::now();

        backend
            .upsert(&row(ContentKind::Projects, json!([{"id": "a", "title": "A"}]), t0))
            .await
            .unwrap();
        backend
            .upsert(&row(
                ContentKind::Projects,
                json!([{"id": "a", "title": "A"}, {"id": "b", "title": "B"}]),
                t0 + Duration::seconds(1),
            ))
            .await
            .unwrap();

        let rows = backend.query_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].content.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_older_row_does_not_replace_newer_one() {
        let (backend, _dir) = open_temp().await;
        let mut subscription = backend.subscribe().await.unwrap();
        let t0 = Utc::now();

        backend
            .upsert(&row(ContentKind::Footer, json!({"text": "newer"}), t0))
            .await
            .unwrap();
        backend
            .upsert(&row(
                ContentKind::Footer,
                json!({"text": "older"}),
                t0 - Duration::seconds(30),
            ))
            .await
            .unwrap();

        let rows = backend.query_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].content["text"], "newer");

        let first = subscription.next().await.unwrap();
        assert_eq!(first.content["text"], "newer");
        let second =
            tokio::time::timeout(std::time::Duration::from_millis(100), subscription.next()).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_query_orders_newest_first() {
        let (backend, _dir) = open_temp().await;
        let t0 = Utc::now();

        backend
            .upsert(&row(ContentKind::Footer, json!({"text": "f"}), t0))
            .await
            .unwrap();
        backend
            .upsert(&row(
                ContentKind::Profile,
                json!({"name": "n", "title": "t"}),
                t0 + Duration::seconds(5),
            ))
            .await
            .unwrap();

        let rows = backend.query_all().await.unwrap();
        assert_eq!(rows[0].kind, ContentKind::Profile);
        assert_eq!(rows[1].kind, ContentKind::Footer);
    }

    #[tokio::test]
    async fn test_subscription_sees_insert_then_update() {
        let (backend, _dir) = open_temp().await;
        let mut subscription = backend.subscribe().await.unwrap();
        let t0 = Utc::now();

        backend
            .upsert(&row(ContentKind::Footer, json!({"text": "one"}), t0))
            .await
            .unwrap();
        backend
            .upsert(&row(
                ContentKind::Footer,
                json!({"text": "two"}),
                t0 + Duration::seconds(1),
            ))
            .await
            .unwrap();

        let first = subscription.next().await.unwrap();
        let second = subscription.next().await.unwrap();
        assert_eq!(first.event_type, ChangeType::Insert);
        assert_eq!(second.event_type, ChangeType::Update);
        assert_eq!(second.content["text"], "two");
    }

    #[tokio::test]
    async fn test_blob_round_trip() {
        let (backend, _dir) = open_temp().await;

        let url = backend
            .upload_blob("avatar.png", "image/png", vec![1, 2, 3])
            .await
            .unwrap();
        let id = url.strip_prefix("/api/blobs/").unwrap();

        let blob = backend.fetch_blob(id).await.unwrap().unwrap();
        assert_eq!(blob.content_type, "image/png");
        assert_eq!(blob.data, vec![1, 2, 3]);
        assert!(backend.fetch_blob("missing").await.unwrap().is_none());
    }
}
