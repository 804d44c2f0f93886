//! Admin authentication.
//!
//! A single configured admin signs in with username and password and receives
//! a session token. Credentials and tokens are compared in constant time.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use subtle::ConstantTimeEq;

use crate::cache::{AdminSession, LocalCache};
use crate::config::AdminCredentials;
use crate::errors::{AppError, AppErrorWithRevision};

/// Alternative header carrying the session token.
pub const SESSION_HEADER: &str = "x-session-token";

pub struct AdminAuth {
    credentials: Option<AdminCredentials>,
    cache: Arc<LocalCache>,
}

impl AdminAuth {
    pub fn new(credentials: Option<AdminCredentials>, cache: Arc<LocalCache>) -> Self {
        Self { credentials, cache }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Check the credentials and start a new session, replacing any previous one.
    pub async fn login(&self, username: &str, password: &str) -> Result<AdminSession, AppError> {
        let Some(expected) = &self.credentials else {
            return Err(AppError::Unauthorized("Admin login is not configured".to_string()));
        };

        // Both comparisons always run.
        let user_ok = constant_time_compare(username, &expected.username);
        let pass_ok = constant_time_compare(password, &expected.password);
        if !(user_ok & pass_ok) {
            tracing::warn!("Rejected admin login for {:?}", username);
            return Err(AppError::Unauthorized("Invalid username or password".to_string()));
        }

        let session = AdminSession {
            username: expected.username.clone(),
            token: uuid::Uuid::new_v4().to_string(),
            issued_at: Utc::now(),
        };
        self.cache.set_session(Some(session.clone())).await?;
        tracing::info!("Admin {} signed in", session.username);
        Ok(session)
    }

    pub async fn logout(&self) -> Result<(), AppError> {
        self.cache.set_session(None).await?;
        tracing::info!("Admin signed out");
        Ok(())
    }

    /// The active session if `token` belongs to it.
    pub async fn verify(&self, token: &str) -> Option<AdminSession> {
        if !self.is_configured() {
            return None;
        }
        self.cache
            .session()
            .await
            .filter(|session| constant_time_compare(token, &session.token))
    }
}

/// Session token from `Authorization: Bearer` or the session header.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "));
    let token = bearer.or_else(|| headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()))?;
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Middleware admitting only requests carrying the active admin session token.
pub async fn admin_auth_layer(auth: Arc<AdminAuth>, request: Request, next: Next) -> Response {
    if !auth.is_configured() {
        return unauthorized_response("Admin access is disabled");
    }

    let Some(token) = session_token(request.headers()) else {
        return unauthorized_response("Missing session token");
    };

    match auth.verify(&token).await {
        Some(_) => next.run(request).await,
        None => unauthorized_response("Invalid or expired session"),
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn unauthorized_response(message: &str) -> Response {
    AppErrorWithRevision {
        error: AppError::Unauthorized(message.to_string()),
        revision: 0,
    }
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use tempfile::TempDir;

    async fn auth_with(credentials: Option<AdminCredentials>) -> (AdminAuth, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(LocalCache::open(dir.path().join("cache.json")).await);
        (AdminAuth::new(credentials, cache), dir)
    }

    fn admin() -> Option<AdminCredentials> {
        Some(AdminCredentials {
            username: "admin".to_string(),
            password: "s3cret".to_string(),
        })
    }

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
    }

    #[test]
    fn test_constant_time_compare_different_lengths() {
        assert!(!constant_time_compare("short", "much-longer-key"));
    }

    #[test]
    fn test_constant_time_compare_empty() {
        assert!(constant_time_compare("", ""));
        assert!(!constant_time_compare("", "not-empty"));
    }

    #[test]
    fn test_session_token_sources() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(SESSION_HEADER, HeaderValue::from_static("from-header"));
        assert_eq!(session_token(&headers).as_deref(), Some("from-header"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-bearer"));
        assert_eq!(session_token(&headers).as_deref(), Some("from-bearer"));
    }

    #[tokio::test]
    async fn test_login_issues_verifiable_token() {
        let (auth, _dir) = auth_with(admin()).await;

        let session = auth.login("admin", "s3cret").await.unwrap();

        assert_eq!(auth.verify(&session.token).await, Some(session.clone()));
        assert!(auth.verify("something-else").await.is_none());

        auth.logout().await.unwrap();
        assert!(auth.verify(&session.token).await.is_none());
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let (auth, _dir) = auth_with(admin()).await;

        let err = auth.login("admin", "guess").await.unwrap_err();

        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_login_disabled_without_credentials() {
        let (auth, _dir) = auth_with(None).await;

        assert!(auth.login("admin", "").await.is_err());
        assert!(auth.verify("anything").await.is_none());
    }
}
