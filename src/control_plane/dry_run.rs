use super::ControlPlaneClient;
use crate::domain::{RunnerGroupSnapshot, RunnerStatus};
use crate::error::AppError;
use async_trait::async_trait;
use log::info;

/// Wraps a `ControlPlaneClient`, logging status updates and
/// deregistrations instead of issuing them — the control-plane half of
/// `--dry-run` (see `cloud_scaler::DryRunCloudScaler`).
pub struct DryRunControlPlaneClient<C> {
    inner: C,
}

impl<C: ControlPlaneClient> DryRunControlPlaneClient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: ControlPlaneClient> ControlPlaneClient for DryRunControlPlaneClient<C> {
    async fn get_runner_group(&self) -> Result<RunnerGroupSnapshot, AppError> {
        self.inner.get_runner_group().await
    }

    async fn update_runner_status(&self, runner_id: &str, status: RunnerStatus) -> Result<(), AppError> {
        info!(
            "[dry-run] would update runner {runner_id} status to {}",
            status.as_wire_str()
        );
        Ok(())
    }

    async fn deregister_runner(&self, runner_id: &str) -> Result<(), AppError> {
        info!("[dry-run] would deregister runner {runner_id}");
        Ok(())
    }
}
