//! Sync status and manual reload.

use axum::extract::State;

use super::{success, ApiResult};
use crate::store::{LoadReport, SyncStatus};
use crate::AppState;

/// GET /api/sync/status
pub async fn sync_status(State(state): State<AppState>) -> ApiResult<SyncStatus> {
    let revision = state.store.revision().await;
    success(state.store.sync_status().await, revision)
}

/// POST /api/sync/reload - Re-read every kind from the backend.
pub async fn reload(State(state): State<AppState>) -> ApiResult<LoadReport> {
    // Local edits must land first or the reload would bring back older rows.
    state.store.flush().await;
    let report = state.store.load().await;
    let revision = state.store.revision().await;
    success(report, revision)
}
