use super::{read_cooldown_timestamp, write_cooldown_timestamp, CloudScaler};
use crate::blob_store::{BlobStore, MemoryBlobStore};
use crate::domain::{CloudVm, Runner};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

const SCALE_OUT_BLOB: &str = "scale_out_timestamp";
const SCALE_IN_BLOB: &str = "scale_in_timestamp";

/// In-memory scale set fake, correlating runners to VMs by exact
/// hostname match (as AWS does) — used to drive `ReconcileEngine` tests
/// against the decision logic in isolation from any real provider.
pub struct MemoryCloudScaler {
    desired_capacity: RwLock<u32>,
    members: RwLock<Vec<CloudVm>>,
    blob_store: MemoryBlobStore,
}

impl MemoryCloudScaler {
    pub fn new(initial_members: Vec<CloudVm>, initial_capacity: u32) -> Self {
        Self {
            desired_capacity: RwLock::new(initial_capacity),
            members: RwLock::new(initial_members),
            blob_store: MemoryBlobStore::new(),
        }
    }

    pub async fn desired_capacity(&self) -> u32 {
        *self.desired_capacity.read().await
    }
}

#[async_trait]
impl CloudScaler for MemoryCloudScaler {
    async fn list_members(&self) -> Result<Vec<CloudVm>, AppError> {
        Ok(self.members.read().await.clone())
    }

    async fn set_desired_capacity(&self, n: u32) -> Result<(), AppError> {
        *self.desired_capacity.write().await = n;
        Ok(())
    }

    async fn add_scale_in_protection(&self, runner: &Runner) -> Result<(), AppError> {
        let mut members = self.members.write().await;
        if let Some(vm) = members.iter_mut().find(|vm| vm.hostname == runner.computer_name) {
            vm.protected_from_scale_in = true;
        }
        Ok(())
    }

    async fn remove_scale_in_protection(&self, runner: &Runner) -> Result<(), AppError> {
        let mut members = self.members.write().await;
        if let Some(vm) = members.iter_mut().find(|vm| vm.hostname == runner.computer_name) {
            vm.protected_from_scale_in = false;
        }
        Ok(())
    }

    async fn count_existing_vms(&self) -> Result<u32, AppError> {
        Ok(self.members.read().await.len() as u32)
    }

    async fn get_last_scale_out_event(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        read_cooldown_timestamp(&self.blob_store, SCALE_OUT_BLOB).await
    }

    async fn set_last_scale_out_event(&self, timestamp: DateTime<Utc>) -> Result<(), AppError> {
        write_cooldown_timestamp(&self.blob_store, SCALE_OUT_BLOB, timestamp).await
    }

    async fn get_last_scale_in_event(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        read_cooldown_timestamp(&self.blob_store, SCALE_IN_BLOB).await
    }

    async fn set_last_scale_in_event(&self, timestamp: DateTime<Utc>) -> Result<(), AppError> {
        write_cooldown_timestamp(&self.blob_store, SCALE_IN_BLOB, timestamp).await
    }
}
