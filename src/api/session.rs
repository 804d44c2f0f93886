//! Admin login, logout and session status.

use axum::{extract::State, http::HeaderMap, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::auth::session_token;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub authenticated: bool,
    pub admin_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let revision = state.store.revision().await;

    match state.auth.login(&request.username, &request.password).await {
        Ok(session) => success(
            LoginResponse {
                token: session.token,
                username: session.username,
                issued_at: session.issued_at,
            },
            revision,
        ),
        Err(e) => error(e, revision),
    }
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>) -> ApiResult<()> {
    let revision = state.store.revision().await;

    match state.auth.logout().await {
        Ok(()) => success((), revision),
        Err(e) => error(e, revision),
    }
}

/// GET /api/auth/session - Whether the caller's token is the active session.
pub async fn get_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<SessionStatus> {
    let revision = state.store.revision().await;

    let session = match session_token(&headers) {
        Some(token) => state.auth.verify(&token).await,
        None => None,
    };

    success(
        SessionStatus {
            authenticated: session.is_some(),
            admin_enabled: state.auth.is_configured(),
            username: session.map(|s| s.username),
        },
        revision,
    )
}
