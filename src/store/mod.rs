//! Content sync store.
//!
//! Single source of truth for the five content kinds during a session. Local
//! mutations are applied in memory before they are queued for the remote
//! backend; inbound change events are reconciled with per-kind
//! last-write-wins timestamps.

pub mod defaults;
mod writer;

pub use writer::WritePolicy;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::backend::{sort_newest_first, BackendMode, RemoteBackend};
use crate::errors::AppError;
use crate::models::{
    ChangeEvent, CollectionItem, ContentKind, ContentRow, PortfolioContent, SingletonItem,
};
use writer::WriteBehind;

const EVENT_CAPACITY: usize = 256;

/// Where an in-memory change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOrigin {
    Local,
    Remote,
    Load,
}

/// Notifications for observers of the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    ContentChanged {
        kind: ContentKind,
        origin: ChangeOrigin,
    },
    Persisted {
        kind: ContentKind,
        updated_at: DateTime<Utc>,
    },
    PersistFailed {
        kind: ContentKind,
        error: String,
        attempts: u32,
    },
}

/// Result of reconciling one inbound change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied,
    /// A previous event is still being reconciled.
    Suppressed,
    /// Not newer than what this kind already holds.
    Stale,
    /// Payload did not decode for its kind.
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub loaded: Vec<ContentKind>,
    pub defaulted: Vec<ContentKind>,
    pub subscribed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub mode: BackendMode,
    pub subscribed: bool,
    pub reconciling: bool,
    pub pending_writes: u64,
    pub failed_writes: u64,
    pub last_update: Option<DateTime<Utc>>,
    pub versions: BTreeMap<ContentKind, DateTime<Utc>>,
}

#[derive(Default)]
struct StoreState {
    content: PortfolioContent,
    /// Timestamp of the content last applied per kind.
    versions: HashMap<ContentKind, DateTime<Utc>>,
}

impl StoreState {
    /// Timestamp for a local write: now, but strictly after anything applied for `kind`.
    fn stamp(&mut self, kind: ContentKind) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.versions.get(&kind) {
            Some(last) if now <= *last => *last + Duration::milliseconds(1),
            _ => now,
        };
        self.versions.insert(kind, ts);
        ts
    }
}

pub struct ContentStore {
    backend: Arc<dyn RemoteBackend>,
    state: RwLock<StoreState>,
    writer: WriteBehind,
    events: broadcast::Sender<StoreEvent>,
    /// Token of the reconciliation in progress, if any.
    guard: Arc<watch::Sender<Option<u64>>>,
    next_guard_token: AtomicU64,
    subscription: Mutex<Option<JoinHandle<()>>>,
}

impl ContentStore {
    /// Create an empty store; call [`ContentStore::load`] to populate it.
    pub fn new(backend: Arc<dyn RemoteBackend>, policy: WritePolicy) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let writer = WriteBehind::spawn(backend.clone(), policy, events.clone());
        let (guard, _) = watch::channel(None);

        Arc::new(Self {
            backend,
            state: RwLock::new(StoreState::default()),
            writer,
            events,
            guard: Arc::new(guard),
            next_guard_token: AtomicU64::new(1),
            subscription: Mutex::new(None),
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn notify(&self, event: StoreEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    // ==================== LOAD ====================

    /// Fetch every kind from the backend, falling back to built-in content for
    /// kinds it does not have. Opens the realtime subscription once the backend
    /// has answered.
    pub async fn load(self: &Arc<Self>) -> LoadReport {
        let rows = match self.backend.query_all().await {
            Ok(mut rows) => {
                sort_newest_first(&mut rows);
                Some(rows)
            }
            Err(AppError::Offline) => None,
            Err(e) => {
                tracing::warn!("Loading content failed, using built-in content: {}", e);
                None
            }
        };

        let mut loaded = Vec::new();
        let mut defaulted = Vec::new();
        {
            let mut state = self.state.write().await;

            for row in rows.iter().flatten() {
                if loaded.contains(&row.kind) {
                    continue;
                }
                if let Some(current) = state.versions.get(&row.kind) {
                    if row.updated_at < *current {
                        loaded.push(row.kind);
                        continue;
                    }
                }
                match state.content.apply_json(row.kind, row.content.clone()) {
                    Ok(()) => {
                        state.versions.insert(row.kind, row.updated_at);
                        loaded.push(row.kind);
                    }
                    Err(e) => tracing::warn!("Stored {} content is unreadable: {}", row.kind, e),
                }
            }

            let builtin = defaults::portfolio();
            for kind in ContentKind::ALL {
                if loaded.contains(&kind) || state.versions.contains_key(&kind) {
                    continue;
                }
                state.content.take_kind_from(&builtin, kind);
                defaulted.push(kind);
            }
        }

        for kind in loaded.iter().chain(defaulted.iter()) {
            self.notify(StoreEvent::ContentChanged {
                kind: *kind,
                origin: ChangeOrigin::Load,
            });
        }

        let subscribed = if rows.is_some() {
            self.ensure_subscribed().await
        } else {
            self.is_subscribed().await
        };

        tracing::info!(
            "Content loaded: {} from backend, {} built-in",
            loaded.len(),
            defaulted.len()
        );

        LoadReport {
            loaded,
            defaulted,
            subscribed,
        }
    }

    /// Open the realtime subscription unless one is already running.
    async fn ensure_subscribed(self: &Arc<Self>) -> bool {
        let mut slot = self.subscription.lock().await;
        if slot.as_ref().is_some_and(|pump| !pump.is_finished()) {
            return true;
        }

        let mut subscription = match self.backend.subscribe().await {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::warn!("Realtime subscription unavailable: {}", e);
                return false;
            }
        };

        let store = Arc::downgrade(self);
        *slot = Some(tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                let Some(store) = store.upgrade() else {
                    break;
                };
                // Feed events arrive in batches; wait out the guard instead of losing them.
                loop {
                    store.wait_reconciled().await;
                    if store.handle_change(event.clone()).await != ReconcileOutcome::Suppressed {
                        break;
                    }
                }
            }
            tracing::debug!("Realtime subscription ended");
        }));

        tracing::info!("Realtime subscription opened");
        true
    }

    async fn is_subscribed(&self) -> bool {
        self.subscription
            .lock()
            .await
            .as_ref()
            .is_some_and(|pump| !pump.is_finished())
    }

    /// Close the realtime subscription. Content stays as it is.
    pub async fn close(&self) {
        if let Some(pump) = self.subscription.lock().await.take() {
            pump.abort();
            tracing::info!("Realtime subscription closed");
        }
    }

    // ==================== REALTIME ====================

    /// Reconcile one inbound change event.
    ///
    /// While an applied event is being reconciled every other event is dropped.
    /// The guard is released once all writes queued up to that point have
    /// completed.
    pub async fn handle_change(&self, event: ChangeEvent) -> ReconcileOutcome {
        let kind = event.kind;
        let token = {
            let mut state = self.state.write().await;

            if self.guard.borrow().is_some() {
                tracing::debug!("Dropping {} change; reconciliation in progress", kind);
                return ReconcileOutcome::Suppressed;
            }

            if let Some(last) = state.versions.get(&kind) {
                if event.updated_at <= *last {
                    tracing::debug!("Dropping stale {} change from {}", kind, event.updated_at);
                    return ReconcileOutcome::Stale;
                }
            }

            if let Err(e) = state.content.apply_json(kind, event.content) {
                tracing::warn!("Ignoring unreadable {} change: {}", kind, e);
                return ReconcileOutcome::Rejected;
            }
            state.versions.insert(kind, event.updated_at);
            if self.writer.supersede(kind, event.updated_at) {
                // An older local write may land after this; write the applied row back over it.
                match state.content.kind_json(kind) {
                    Ok(content) => {
                        self.writer.enqueue(ContentRow {
                            kind,
                            content,
                            updated_at: event.updated_at,
                        });
                    }
                    Err(e) => {
                        tracing::error!("Failed to serialize {} for persistence: {}", kind, e)
                    }
                }
            }

            let token = self.next_guard_token.fetch_add(1, Ordering::Relaxed);
            self.guard.send_replace(Some(token));
            token
        };

        tracing::debug!("Applied remote {} change from {}", kind, event.updated_at);
        self.notify(StoreEvent::ContentChanged {
            kind,
            origin: ChangeOrigin::Remote,
        });

        let writes_done = self.writer.barrier();
        let guard = self.guard.clone();
        tokio::spawn(async move {
            writes_done.await;
            guard.send_if_modified(|current| {
                if *current == Some(token) {
                    *current = None;
                    true
                } else {
                    false
                }
            });
        });

        ReconcileOutcome::Applied
    }

    /// Resolves when no reconciliation is in progress.
    pub async fn wait_reconciled(&self) {
        let mut guard = self.guard.subscribe();
        let _ = guard.wait_for(|token| token.is_none()).await;
    }

    // ==================== READS ====================

    pub async fn snapshot(&self) -> PortfolioContent {
        self.state.read().await.content.clone()
    }

    pub async fn kind_json(&self, kind: ContentKind) -> Result<serde_json::Value, AppError> {
        self.state.read().await.content.kind_json(kind)
    }

    pub async fn list<T: CollectionItem>(&self) -> Vec<T> {
        T::items(&self.state.read().await.content).clone()
    }

    pub async fn get<T: CollectionItem>(&self, id: &str) -> Option<T> {
        T::items(&self.state.read().await.content)
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    pub async fn singleton<S: SingletonItem>(&self) -> S {
        S::get(&self.state.read().await.content).clone()
    }

    /// Newest timestamp applied for any kind.
    pub async fn last_update_time(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.versions.values().max().copied()
    }

    /// `last_update_time` as epoch milliseconds, 0 before anything was applied.
    pub async fn revision(&self) -> i64 {
        self.last_update_time()
            .await
            .map(|ts| ts.timestamp_millis())
            .unwrap_or(0)
    }

    pub async fn sync_status(&self) -> SyncStatus {
        let versions: BTreeMap<_, _> = self
            .state
            .read()
            .await
            .versions
            .iter()
            .map(|(kind, ts)| (*kind, *ts))
            .collect();
        let subscribed = self.is_subscribed().await;
        let reconciling = self.guard.borrow().is_some();

        SyncStatus {
            mode: self.backend.mode(),
            subscribed,
            reconciling,
            pending_writes: self.writer.pending(),
            failed_writes: self.writer.failures(),
            last_update: versions.values().max().copied(),
            versions,
        }
    }

    // ==================== MUTATIONS ====================

    /// Append a new item with a fresh id.
    pub async fn create<T: CollectionItem>(&self, request: T::Create) -> T {
        let item = {
            let mut state = self.state.write().await;
            let id = fresh_id(T::items(&state.content));
            let item = T::from_request(id, request);
            T::items_mut(&mut state.content).push(item.clone());
            self.commit_local(&mut state, T::KIND);
            item
        };

        self.notify_local(T::KIND);
        item
    }

    /// Merge `patch` into the item with `id`. `None` when there is no such item.
    pub async fn update<T: CollectionItem>(&self, id: &str, patch: T::Patch) -> Option<T> {
        let updated = {
            let mut state = self.state.write().await;
            let item = T::items_mut(&mut state.content)
                .iter_mut()
                .find(|item| item.id() == id)?;
            item.merge(patch);
            let updated = item.clone();
            self.commit_local(&mut state, T::KIND);
            updated
        };

        self.notify_local(T::KIND);
        Some(updated)
    }

    /// Remove the item with `id`. Returns whether anything was removed.
    pub async fn delete<T: CollectionItem>(&self, id: &str) -> bool {
        {
            let mut state = self.state.write().await;
            let items = T::items_mut(&mut state.content);
            let before = items.len();
            items.retain(|item| item.id() != id);
            if items.len() == before {
                return false;
            }
            self.commit_local(&mut state, T::KIND);
        }

        self.notify_local(T::KIND);
        true
    }

    pub async fn update_singleton<S: SingletonItem>(&self, patch: S::Patch) -> S {
        let updated = {
            let mut state = self.state.write().await;
            let value = S::get_mut(&mut state.content);
            value.merge(patch);
            let updated = value.clone();
            self.commit_local(&mut state, S::KIND);
            updated
        };

        self.notify_local(S::KIND);
        updated
    }

    /// Resolves once every write queued so far has completed.
    pub async fn flush(&self) {
        self.writer.barrier().await;
    }

    /// Stamp `kind` and queue its whole collection for the backend.
    fn commit_local(&self, state: &mut StoreState, kind: ContentKind) {
        let updated_at = state.stamp(kind);
        match state.content.kind_json(kind) {
            Ok(content) => {
                self.writer.enqueue(ContentRow {
                    kind,
                    content,
                    updated_at,
                });
            }
            Err(e) => tracing::error!("Failed to serialize {} for persistence: {}", kind, e),
        }
    }

    fn notify_local(&self, kind: ContentKind) {
        self.notify(StoreEvent::ContentChanged {
            kind,
            origin: ChangeOrigin::Local,
        });
    }
}

impl Drop for ContentStore {
    fn drop(&mut self) {
        if let Some(pump) = self.subscription.get_mut().take() {
            pump.abort();
        }
    }
}

/// A new id not used by any item in `items`.
fn fresh_id<T: CollectionItem>(items: &[T]) -> String {
    loop {
        let id = uuid::Uuid::new_v4().to_string();
        if !items.iter().any(|item| item.id() == id) {
            return id;
        }
    }
}
