use super::CloudScaler;
use crate::domain::{CloudVm, Runner};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;

/// Wraps a `CloudScaler`, logging every mutating call instead of issuing
/// it. Reads pass straight through so the engine's decision logic still
/// sees real state.
pub struct DryRunCloudScaler<C> {
    inner: C,
}

impl<C: CloudScaler> DryRunCloudScaler<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: CloudScaler> CloudScaler for DryRunCloudScaler<C> {
    async fn list_members(&self) -> Result<Vec<CloudVm>, AppError> {
        self.inner.list_members().await
    }

    async fn set_desired_capacity(&self, n: u32) -> Result<(), AppError> {
        info!("[dry-run] would set desired capacity to {n}");
        Ok(())
    }

    async fn add_scale_in_protection(&self, runner: &Runner) -> Result<(), AppError> {
        info!("[dry-run] would add scale-in protection to {}", runner.computer_name);
        Ok(())
    }

    async fn remove_scale_in_protection(&self, runner: &Runner) -> Result<(), AppError> {
        info!("[dry-run] would remove scale-in protection from {}", runner.computer_name);
        Ok(())
    }

    async fn count_existing_vms(&self) -> Result<u32, AppError> {
        self.inner.count_existing_vms().await
    }

    async fn get_last_scale_out_event(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        self.inner.get_last_scale_out_event().await
    }

    async fn set_last_scale_out_event(&self, _timestamp: DateTime<Utc>) -> Result<(), AppError> {
        info!("[dry-run] would record scale-out cooldown timestamp");
        Ok(())
    }

    async fn get_last_scale_in_event(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        self.inner.get_last_scale_in_event().await
    }

    async fn set_last_scale_in_event(&self, _timestamp: DateTime<Utc>) -> Result<(), AppError> {
        info!("[dry-run] would record scale-in cooldown timestamp");
        Ok(())
    }
}
