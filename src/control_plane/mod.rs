//! REST client against the job-orchestration platform.

mod dry_run;
mod http;
mod memory;
mod wire;

pub use dry_run::DryRunControlPlaneClient;
pub use http::HttpControlPlaneClient;
pub use memory::MemoryControlPlaneClient;

use crate::domain::{RunnerGroupSnapshot, RunnerStatus};
use crate::error::AppError;
use async_trait::async_trait;

#[async_trait]
pub trait ControlPlaneClient: Send + Sync {
    /// Fetches a fresh runner-group snapshot. A missing
    /// `QueuedWorkflowsCount` in the response is a fatal schema
    /// violation.
    async fn get_runner_group(&self) -> Result<RunnerGroupSnapshot, AppError>;

    async fn update_runner_status(&self, runner_id: &str, status: RunnerStatus) -> Result<(), AppError>;

    async fn deregister_runner(&self, runner_id: &str) -> Result<(), AppError>;
}
