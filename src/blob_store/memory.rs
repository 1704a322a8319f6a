use super::BlobStore;
use crate::error::AppError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory blob store used to drive the engine's decision logic in
/// tests without a real S3/Azure Blob backend.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, name: &str) -> Result<Option<String>, AppError> {
        Ok(self.objects.read().await.get(name).cloned())
    }

    async fn put(&self, name: &str, contents: &str) -> Result<(), AppError> {
        self.objects
            .write()
            .await
            .insert(name.to_string(), contents.to_string());
        Ok(())
    }
}
