//! Durable small UTF-8 object storage, used only for the two cooldown
//! timestamps. `get` distinguishes "no such key" (`Ok(None)`)
//! from a transport failure (`Err`); `put` is an unconditional overwrite.

mod azure;
mod memory;
mod s3;

pub use azure::AzureBlobStore;
pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;

use crate::error::AppError;
use async_trait::async_trait;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<String>, AppError>;
    async fn put(&self, name: &str, contents: &str) -> Result<(), AppError>;
}
