use super::BlobStore;
use crate::error::AppError;
use async_trait::async_trait;
use aws_sdk_s3::Client;

/// S3-backed blob store. A `NoSuchKey` error is absence, not failure;
/// every other S3 error propagates.
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn get(&self, name: &str) -> Result<Option<String>, AppError> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    return Ok(None);
                }
                return Err(AppError::BlobStoreError(service_err.to_string()));
            }
        };

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| AppError::BlobStoreError(e.to_string()))?
            .into_bytes();

        let contents = String::from_utf8(bytes.to_vec())
            .map_err(|e| AppError::BlobStoreError(format!("blob {name} is not valid UTF-8: {e}")))?;

        Ok(Some(contents))
    }

    async fn put(&self, name: &str, contents: &str) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .body(contents.as_bytes().to_vec().into())
            .send()
            .await
            .map_err(|e| AppError::BlobStoreError(e.to_string()))?;

        Ok(())
    }
}
