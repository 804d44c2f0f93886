//! Hosted backend client speaking PostgREST-style row endpoints plus object storage.
//!
//! The change feed polls the content table and reports every kind whose
//! `updated_at` moved forward since the previous poll.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::{sort_newest_first, BackendMode, RawRow, RemoteBackend, Subscription};
use crate::errors::AppError;
use crate::models::{ChangeEvent, ChangeType, ContentKind, ContentRow};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;
const CONTENT_TABLE: &str = "portfolio_content";

#[derive(Debug, Clone)]
pub struct RestBackend {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
    bucket: String,
    poll_interval: Duration,
}

impl RestBackend {
    /// Create a client for the service at `base_url` authenticated with `key`.
    pub fn new(
        base_url: &str,
        key: &str,
        bucket: &str,
        poll_interval: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        let mut headers = HeaderMap::new();
        let key_value = HeaderValue::from_str(key)
            .map_err(|_| AppError::BadRequest("Invalid access key format".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", key))
            .map_err(|_| AppError::BadRequest("Invalid access key format".to_string()))?;
        headers.insert("apikey", key_value);
        headers.insert(AUTHORIZATION, bearer);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
            bucket: bucket.to_string(),
            poll_interval,
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, CONTENT_TABLE)
    }

    fn public_object_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, name
        )
    }

    /// Turn a non-success response into [`AppError::Remote`].
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
        let status = response.status();
        if status.is_success() {
            tracing::debug!("API response status: {}", status);
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        tracing::debug!("API response error ({}): {}", status, preview);

        Err(AppError::Remote {
            status: status.as_u16(),
            message: preview,
        })
    }

    async fn fetch_rows(&self) -> Result<Vec<ContentRow>, AppError> {
        let response = self
            .client
            .get(self.table_url())
            .headers(self.headers.clone())
            .query(&[
                ("select", "content_type,content,updated_at"),
                ("order", "updated_at.desc"),
            ])
            .send()
            .await?;

        let raw: Vec<RawRow> = Self::check(response).await?.json().await?;
        let mut rows: Vec<ContentRow> = raw.into_iter().filter_map(RawRow::into_row).collect();
        sort_newest_first(&mut rows);
        Ok(rows)
    }
}

#[async_trait]
impl RemoteBackend for RestBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Rest
    }

    async fn upsert(&self, row: &ContentRow) -> Result<(), AppError> {
        let response = self
            .client
            .post(self.table_url())
            .headers(self.headers.clone())
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .query(&[("on_conflict", "content_type")])
            .json(&[row])
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn query_all(&self) -> Result<Vec<ContentRow>, AppError> {
        self.fetch_rows().await
    }

    async fn subscribe(&self) -> Result<Subscription, AppError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let backend = self.clone();

        let worker = tokio::spawn(async move {
            let mut seen: HashMap<ContentKind, DateTime<Utc>> = HashMap::new();
            let mut ticker = tokio::time::interval(backend.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let rows = match backend.fetch_rows().await {
                    Ok(rows) => rows,
                    Err(e) => {
                        tracing::warn!("Change feed poll failed: {}", e);
                        continue;
                    }
                };

                for event in diff_rows(&mut seen, rows) {
                    if tx.send(event).is_err() {
                        return;
                    }
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
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, name
        );
        let response = self
            .client
            .post(url)
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(data)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(self.public_object_url(name))
    }
}

/// Events for every row newer than what the previous poll saw.
fn diff_rows(
    seen: &mut HashMap<ContentKind, DateTime<Utc>>,
    rows: Vec<ContentRow>,
) -> Vec<ChangeEvent> {
    let mut events = Vec::new();
    for row in rows {
        let event_type = match seen.get(&row.kind) {
            Some(previous) if *previous >= row.updated_at => continue,
            Some(_) => ChangeType::Update,
            None => ChangeType::Insert,
        };
        seen.insert(row.kind, row.updated_at);
        events.push(ChangeEvent::from_row(row, event_type));
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Bytes,
        extract::{Path, State},
        http::{HeaderMap as AxumHeaders, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockService {
        rows: Arc<Mutex<Vec<Value>>>,
        uploads: Arc<Mutex<Vec<(String, String, usize)>>>,
        fail_with: Arc<Mutex<Option<u16>>>,
    }

    async fn list_rows(
        State(svc): State<MockService>,
        headers: AxumHeaders,
    ) -> Result<Json<Vec<Value>>, StatusCode> {
        if headers.get("apikey").and_then(|v| v.to_str().ok()) != Some("test-key") {
            return Err(StatusCode::UNAUTHORIZED);
        }
        if let Some(code) = *svc.fail_with.lock().await {
            return Err(StatusCode::from_u16(code).unwrap());
        }
        let mut rows = svc.rows.lock().await.clone();
        rows.sort_by(|a, b| {
            b["updated_at"]
                .as_str()
                .unwrap()
                .cmp(a["updated_at"].as_str().unwrap())
        });
        Ok(Json(rows))
    }

    async fn upsert_rows(
        State(svc): State<MockService>,
        Json(body): Json<Vec<Value>>,
    ) -> StatusCode {
        let mut rows = svc.rows.lock().await;
        for incoming in body {
            rows.retain(|r| r["content_type"] != incoming["content_type"]);
            rows.push(incoming);
        }
        StatusCode::CREATED
    }

    async fn upload(
        State(svc): State<MockService>,
        Path((bucket, name)): Path<(String, String)>,
        body: Bytes,
    ) -> StatusCode {
        svc.uploads.lock().await.push((bucket, name, body.len()));
        StatusCode::OK
    }

    async fn start_mock() -> (String, MockService) {
        let svc = MockService::default();
        let app = Router::new()
            .route("/rest/v1/portfolio_content", get(list_rows).post(upsert_rows))
            .route("/storage/v1/object/{bucket}/{name}", post(upload))
            .with_state(svc.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), svc)
    }

    fn backend(url: &str) -> RestBackend {
        RestBackend::new(url, "test-key", "images", Duration::from_millis(50)).unwrap()
    }

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[tokio::test]
    async fn test_upsert_then_query() {
        let (url, _svc) = start_mock().await;
        let backend = backend(&url);

        backend
            .upsert(&ContentRow {
                kind: ContentKind::Footer,
                content: json!({"text": "hello"}),
                updated_at: ts("2024-01-01T00:00:00Z"),
            })
            .await
            .unwrap();
        backend
            .upsert(&ContentRow {
                kind: ContentKind::Profile,
                content: json!({"name": "A", "title": "B"}),
                updated_at: ts("2024-02-01T00:00:00Z"),
            })
            .await
            .unwrap();

        let rows = backend.query_all().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].kind, ContentKind::Profile);
        assert_eq!(rows[1].content["text"], "hello");
    }

    #[tokio::test]
    async fn test_unknown_kinds_are_skipped() {
        let (url, svc) = start_mock().await;
        svc.rows.lock().await.push(json!({
            "content_type": "blog",
            "content": [],
            "updated_at": "2024-01-01T00:00:00+00:00"
        }));

        let rows = backend(&url).query_all().await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_retryable_remote_error() {
        let (url, svc) = start_mock().await;
        *svc.fail_with.lock().await = Some(503);

        let err = backend(&url).query_all().await.unwrap_err();
        assert!(matches!(err, AppError::Remote { status: 503, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_wrong_key_is_permanent_failure() {
        let (url, _svc) = start_mock().await;
        let backend =
            RestBackend::new(&url, "other-key", "images", Duration::from_millis(50)).unwrap();

        let err = backend.query_all().await.unwrap_err();
        assert!(matches!(err, AppError::Remote { status: 401, .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_poll_feed_reports_changes() {
        let (url, _svc) = start_mock().await;
        let backend = backend(&url);
        let mut subscription = backend.subscribe().await.unwrap();

        backend
            .upsert(&ContentRow {
                kind: ContentKind::Footer,
                content: json!({"text": "v1"}),
                updated_at: ts("2024-01-01T00:00:00Z"),
            })
            .await
            .unwrap();

        let first = tokio::time::timeout(Duration::from_secs(2), subscription.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.kind, ContentKind::Footer);
        assert_eq!(first.event_type, ChangeType::Insert);

        backend
            .upsert(&ContentRow {
                kind: ContentKind::Footer,
                content: json!({"text": "v2"}),
                updated_at: ts("2024-01-02T00:00:00Z"),
            })
            .await
            .unwrap();

        let second = tokio::time::timeout(Duration::from_secs(2), subscription.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.event_type, ChangeType::Update);
        assert_eq!(second.content["text"], "v2");
    }

    #[tokio::test]
    async fn test_store_applies_every_kind_from_one_poll() {
        use crate::models::{Footer, Profile};
        use crate::store::{ContentStore, WritePolicy};

        let (url, svc) = start_mock().await;
        let store = ContentStore::new(Arc::new(backend(&url)), WritePolicy::default());
        assert!(store.load().await.subscribed);

        // Both rows land between two polls.
        {
            let mut rows = svc.rows.lock().await;
            rows.push(json!({
                "content_type": "footer",
                "content": {"text": "Remote footer", "links": []},
                "updated_at": "2099-01-01T00:00:00Z"
            }));
            rows.push(json!({
                "content_type": "profile",
                "content": {"name": "Remote Name", "title": "Remote Title"},
                "updated_at": "2099-01-01T00:00:01Z"
            }));
        }

        let both_applied = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let footer = store.singleton::<Footer>().await;
                let profile = store.singleton::<Profile>().await;
                if footer.text == "Remote footer" && profile.name == "Remote Name" {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;

        assert!(both_applied.is_ok());
    }

    #[tokio::test]
    async fn test_upload_returns_public_url() {
        let (url, svc) = start_mock().await;

        let public = backend(&url)
            .upload_blob("me.png", "image/png", vec![0; 16])
            .await
            .unwrap();

        assert_eq!(
            public,
            format!("{}/storage/v1/object/public/images/me.png", url)
        );
        let uploads = svc.uploads.lock().await;
        assert_eq!(uploads[0], ("images".to_string(), "me.png".to_string(), 16));
    }

    #[test]
    fn test_diff_ignores_rows_already_seen() {
        let mut seen = HashMap::new();
        let row = ContentRow {
            kind: ContentKind::Projects,
            content: json!([]),
            updated_at: ts("2024-03-01T00:00:00Z"),
        };

        assert_eq!(diff_rows(&mut seen, vec![row.clone()]).len(), 1);
        assert!(diff_rows(&mut seen, vec![row]).is_empty());
    }
}
