//! Theme preference endpoints.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemePreference {
    pub dark_mode: bool,
}

/// GET /api/preferences/theme
pub async fn get_theme(State(state): State<AppState>) -> ApiResult<ThemePreference> {
    let revision = state.store.revision().await;
    success(
        ThemePreference {
            dark_mode: state.cache.dark_mode().await,
        },
        revision,
    )
}

/// PUT /api/preferences/theme
pub async fn set_theme(
    State(state): State<AppState>,
    Json(request): Json<ThemePreference>,
) -> ApiResult<ThemePreference> {
    let revision = state.store.revision().await;

    match state.cache.set_dark_mode(request.dark_mode).await {
        Ok(()) => success(request, revision),
        Err(e) => error(e, revision),
    }
}
