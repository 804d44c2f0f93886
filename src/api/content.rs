//! Whole-content read endpoints.

use axum::extract::{Path, State};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{ContentKind, PortfolioContent};
use crate::AppState;

/// GET /api/content - Everything the site renders.
pub async fn get_content(State(state): State<AppState>) -> ApiResult<PortfolioContent> {
    let revision = state.store.revision().await;
    success(state.store.snapshot().await, revision)
}

/// GET /api/content/:kind - One content kind as stored remotely.
pub async fn get_content_kind(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<serde_json::Value> {
    let revision = state.store.revision().await;

    let Some(kind) = ContentKind::parse(&kind) else {
        return error(
            AppError::NotFound(format!("Unknown content kind {}", kind)),
            revision,
        );
    };

    match state.store.kind_json(kind).await {
        Ok(value) => success(value, revision),
        Err(e) => error(e, revision),
    }
}
