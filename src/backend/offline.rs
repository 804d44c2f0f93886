//! Backend used when no real connection parameters are configured.

use async_trait::async_trait;

use super::{BackendMode, RemoteBackend, Subscription};
use crate::errors::AppError;
use crate::models::ContentRow;

/// Never touches the network; every call reports [`AppError::Offline`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineBackend;

#[async_trait]
impl RemoteBackend for OfflineBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Offline
    }

    async fn upsert(&self, _row: &ContentRow) -> Result<(), AppError> {
        Err(AppError::Offline)
    }

    async fn query_all(&self) -> Result<Vec<ContentRow>, AppError> {
        Err(AppError::Offline)
    }

    async fn subscribe(&self) -> Result<Subscription, AppError> {
        Err(AppError::Offline)
    }

    async fn upload_blob(
        &self,
        _name: &str,
        _content_type: &str,
        _data: Vec<u8>,
    ) -> Result<String, AppError> {
        Err(AppError::Offline)
    }
}
