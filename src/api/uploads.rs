//! Image upload and blob serving endpoints.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};

use super::{error, success, ApiResult};
use crate::backend::{Blob, UploadedBlob};
use crate::errors::{AppError, AppErrorWithRevision};
use crate::AppState;

/// Header carrying the original file name of an upload.
pub const FILE_NAME_HEADER: &str = "x-file-name";

/// POST /api/uploads - Store an image; the body is the raw file.
pub async fn upload_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<UploadedBlob> {
    let revision = state.store.revision().await;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.starts_with("image/") {
        return error(
            AppError::Validation("Only image uploads are accepted".to_string()),
            revision,
        );
    }
    if body.is_empty() {
        return error(AppError::Validation("Upload is empty".to_string()), revision);
    }

    let name = headers
        .get(FILE_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("upload");

    let uploaded = state.blobs.upload(name, &content_type, body.to_vec()).await;
    tracing::info!(
        "Stored upload {} ({} bytes, transient: {})",
        uploaded.url,
        body.len(),
        uploaded.transient
    );
    success(uploaded, revision)
}

/// GET /api/blobs/:id - Serve a blob stored by the backend.
pub async fn get_blob(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.blobs.remote(&id).await {
        Ok(Some(blob)) => blob_response(blob),
        Ok(None) => blob_not_found(&id),
        Err(e) => AppErrorWithRevision {
            error: e,
            revision: state.store.revision().await,
        }
        .into_response(),
    }
}

/// GET /api/blobs/local/:id - Serve a blob held in memory.
pub async fn get_local_blob(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.blobs.local(&id).await {
        Some(blob) => blob_response(blob),
        None => blob_not_found(&id),
    }
}

fn blob_response(blob: Blob) -> Response {
    ([(header::CONTENT_TYPE, blob.content_type)], blob.data).into_response()
}

fn blob_not_found(id: &str) -> Response {
    AppErrorWithRevision {
        error: AppError::NotFound(format!("Blob {} not found", id)),
        revision: 0,
    }
    .into_response()
}
