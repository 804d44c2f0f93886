//! Image uploads with a local fallback.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use super::{Blob, RemoteBackend};
use crate::errors::AppError;

/// URL prefix of blobs held only in this process.
pub const LOCAL_BLOB_PREFIX: &str = "/api/blobs/local/";

/// Where an uploaded image can be fetched from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadedBlob {
    pub url: String,
    /// `true` when the image only lives in memory and is lost on restart.
    pub transient: bool,
}

/// Uploads to the remote backend, degrading to in-memory storage when it is
/// unreachable or unconfigured.
pub struct BlobStore {
    backend: Arc<dyn RemoteBackend>,
    transient: RwLock<HashMap<String, Blob>>,
}

impl BlobStore {
    pub fn new(backend: Arc<dyn RemoteBackend>) -> Self {
        Self {
            backend,
            transient: RwLock::new(HashMap::new()),
        }
    }

    pub async fn upload(&self, name: &str, content_type: &str, data: Vec<u8>) -> UploadedBlob {
        let object_name = format!("{}-{}", uuid::Uuid::new_v4(), sanitize_name(name));

        match self
            .backend
            .upload_blob(&object_name, content_type, data.clone())
            .await
        {
            Ok(url) => UploadedBlob {
                url,
                transient: false,
            },
            Err(e) => {
                match e {
                    AppError::Offline => tracing::debug!("Keeping upload {} in memory", name),
                    _ => tracing::warn!("Upload of {} failed, keeping it in memory: {}", name, e),
                }
                let id = uuid::Uuid::new_v4().to_string();
                self.transient.write().await.insert(
                    id.clone(),
                    Blob {
                        name: name.to_string(),
                        content_type: content_type.to_string(),
                        data,
                    },
                );
                UploadedBlob {
                    url: format!("{}{}", LOCAL_BLOB_PREFIX, id),
                    transient: true,
                }
            }
        }
    }

    /// Look up an in-memory blob.
    pub async fn local(&self, id: &str) -> Option<Blob> {
        self.transient.read().await.get(id).cloned()
    }

    /// Look up a blob served by the backend itself.
    pub async fn remote(&self, id: &str) -> Result<Option<Blob>, AppError> {
        self.backend.fetch_blob(id).await
    }
}

/// Keep object names to a URL-safe subset.
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::OfflineBackend;

    #[tokio::test]
    async fn test_offline_upload_is_transient_and_served_locally() {
        let store = BlobStore::new(Arc::new(OfflineBackend));

        let uploaded = store.upload("me.png", "image/png", vec![7, 7]).await;

        assert!(uploaded.transient);
        let id = uploaded.url.strip_prefix(LOCAL_BLOB_PREFIX).unwrap();
        let blob = store.local(id).await.unwrap();
        assert_eq!(blob.data, vec![7, 7]);
        assert_eq!(blob.content_type, "image/png");
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_name(""), "upload");
    }
}
