//! Profile and footer endpoints.

use axum::{extract::State, Json};

use super::{success, ApiResult};
use crate::models::SingletonItem;
use crate::AppState;

/// GET /api/{profile|footer}
pub async fn get_singleton<S: SingletonItem>(State(state): State<AppState>) -> ApiResult<S> {
    let revision = state.store.revision().await;
    success(state.store.singleton::<S>().await, revision)
}

/// PUT /api/{profile|footer} - Merge a partial update.
pub async fn update_singleton<S: SingletonItem>(
    State(state): State<AppState>,
    Json(patch): Json<S::Patch>,
) -> ApiResult<S> {
    let updated = state.store.update_singleton::<S>(patch).await;
    tracing::info!("Updated {}", S::KIND);

    let revision = state.store.revision().await;
    success(updated, revision)
}
