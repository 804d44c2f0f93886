//! Endpoints for the id-keyed collections: projects, certificates, experiences.
//!
//! Handlers are generic over [`CollectionItem`] and mounted once per kind.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CollectionItem, Project};
use crate::AppState;

/// Query parameters for filtering projects.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectFilter {
    pub category: Option<String>,
    pub featured: Option<bool>,
}

/// GET /api/projects - List projects, optionally filtered.
pub async fn list_projects(
    State(state): State<AppState>,
    Query(filter): Query<ProjectFilter>,
) -> ApiResult<Vec<Project>> {
    let revision = state.store.revision().await;

    let projects = state
        .store
        .list::<Project>()
        .await
        .into_iter()
        .filter(|p| {
            filter
                .category
                .as_deref()
                .map_or(true, |c| p.category.eq_ignore_ascii_case(c))
        })
        .filter(|p| filter.featured.map_or(true, |f| p.featured == f))
        .collect();

    success(projects, revision)
}

/// GET /api/{kind} - List every item of a collection.
pub async fn list_items<T: CollectionItem>(State(state): State<AppState>) -> ApiResult<Vec<T>> {
    let revision = state.store.revision().await;
    success(state.store.list::<T>().await, revision)
}

/// GET /api/{kind}/:id - Get a single item.
pub async fn get_item<T: CollectionItem>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<T> {
    let revision = state.store.revision().await;

    match state.store.get::<T>(&id).await {
        Some(item) => success(item, revision),
        None => error(not_found::<T>(&id), revision),
    }
}

/// POST /api/{kind} - Create an item with a fresh id.
pub async fn create_item<T: CollectionItem>(
    State(state): State<AppState>,
    Json(request): Json<T::Create>,
) -> ApiResult<T> {
    if let Err(e) = T::validate(&request) {
        let revision = state.store.revision().await;
        return error(e, revision);
    }

    let item = state.store.create::<T>(request).await;
    tracing::info!("Created {} item {}", T::KIND, item.id());

    let revision = state.store.revision().await;
    success(item, revision)
}

/// PUT /api/{kind}/:id - Merge a partial update into an item.
pub async fn update_item<T: CollectionItem>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<T::Patch>,
) -> ApiResult<T> {
    let updated = state.store.update::<T>(&id, patch).await;
    let revision = state.store.revision().await;

    match updated {
        Some(item) => success(item, revision),
        None => error(not_found::<T>(&id), revision),
    }
}

/// DELETE /api/{kind}/:id - Remove an item.
pub async fn delete_item<T: CollectionItem>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let removed = state.store.delete::<T>(&id).await;
    let revision = state.store.revision().await;

    if removed {
        tracing::info!("Deleted {} item {}", T::KIND, id);
        success((), revision)
    } else {
        error(not_found::<T>(&id), revision)
    }
}

fn not_found<T: CollectionItem>(id: &str) -> AppError {
    AppError::NotFound(format!("No {} item with id {}", T::KIND, id))
}
