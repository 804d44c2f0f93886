//! REST API module.
//!
//! Contains all API routes and handlers. Every response carries the store's
//! current revision so clients can tell whether their copy is behind.

mod collections;
mod content;
mod preferences;
mod session;
mod singletons;
mod sync;
mod uploads;

pub use collections::*;
pub use content::*;
pub use preferences::*;
pub use session::*;
pub use singletons::*;
pub use sync::*;
pub use uploads::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub revision: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision: i64) -> Self {
        Self {
            success: true,
            data,
            revision,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, crate::errors::AppErrorWithRevision>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, revision: i64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, revision))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: crate::errors::AppError, revision: i64) -> ApiResult<T> {
    Err(crate::errors::AppErrorWithRevision {
        error: err,
        revision,
    })
}
