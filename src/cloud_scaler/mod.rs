//! Abstracts the underlying cloud scale set: enumerate
//! member VMs, set desired capacity, toggle per-instance scale-in
//! protection, and persist the cooldown ledger via a `BlobStore`.
//!
//! Runner↔VM correlation is provider-local (AWS: exact hostname match;
//! Azure: hostname prefix) and hidden entirely behind
//! `add_scale_in_protection`/`remove_scale_in_protection` — the engine
//! never sees a `CloudVm` except through `list_members`/`count_existing_vms`.

mod aws;
mod azure;
mod dry_run;
mod memory;

pub use aws::AwsCloudScaler;
pub use azure::AzureCloudScaler;
pub use dry_run::DryRunCloudScaler;
pub use memory::MemoryCloudScaler;

use crate::blob_store::BlobStore;
use crate::domain::{CloudVm, Runner};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait CloudScaler: Send + Sync {
    async fn list_members(&self) -> Result<Vec<CloudVm>, AppError>;

    /// Request absolute target capacity `n`. Asynchronous on the
    /// provider; callers do not await convergence.
    async fn set_desired_capacity(&self, n: u32) -> Result<(), AppError>;

    /// Locates the CloudVm correlated to `runner` and marks it protected.
    /// Idempotent. If no VM correlates, logs and returns `Ok(())` — the
    /// runner may already be gone.
    async fn add_scale_in_protection(&self, runner: &Runner) -> Result<(), AppError>;
    async fn remove_scale_in_protection(&self, runner: &Runner) -> Result<(), AppError>;

    /// The provider's own view of current capacity (Azure: SKU capacity;
    /// AWS: number of ASG members).
    async fn count_existing_vms(&self) -> Result<u32, AppError>;

    async fn get_last_scale_out_event(&self) -> Result<Option<DateTime<Utc>>, AppError>;
    async fn set_last_scale_out_event(&self, timestamp: DateTime<Utc>) -> Result<(), AppError>;
    async fn get_last_scale_in_event(&self) -> Result<Option<DateTime<Utc>>, AppError>;
    async fn set_last_scale_in_event(&self, timestamp: DateTime<Utc>) -> Result<(), AppError>;
}

/// Shared cooldown-ledger plumbing: both provider implementations read
/// and write the same two blobs, differing only in which `BlobStore`
/// backs them and what name each blob has.
async fn read_cooldown_timestamp(
    store: &dyn BlobStore,
    blob_name: &str,
) -> Result<Option<DateTime<Utc>>, AppError> {
    let Some(raw) = store.get(blob_name).await? else {
        return Ok(None);
    };

    let parsed = DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| naive.and_utc())
        })
        .map_err(|e| AppError::TimestampParseError(format!("blob {blob_name}: {e}")))?;

    Ok(Some(parsed))
}

async fn write_cooldown_timestamp(
    store: &dyn BlobStore,
    blob_name: &str,
    timestamp: DateTime<Utc>,
) -> Result<(), AppError> {
    store.put(blob_name, &timestamp.to_rfc3339()).await
}
