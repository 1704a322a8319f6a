use super::ControlPlaneClient;
use crate::domain::{Runner, RunnerGroupSnapshot, RunnerStatus};
use crate::error::AppError;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// In-memory control-plane fake used to drive `ReconcileEngine` in tests
/// without a real HTTP backend. Mutations (`update_runner_status`,
/// `deregister_runner`) apply directly to the held runner list so a
/// subsequent `get_runner_group` reflects them, matching the real
/// client's "refresh after mutation" semantics.
pub struct MemoryControlPlaneClient {
    state: RwLock<RunnerGroupSnapshot>,
}

impl MemoryControlPlaneClient {
    pub fn new(runners: Vec<Runner>, queued_jobs: u64) -> Self {
        Self {
            state: RwLock::new(RunnerGroupSnapshot {
                runners,
                queued_jobs,
            }),
        }
    }

    pub async fn set_queued_jobs(&self, queued_jobs: u64) {
        self.state.write().await.queued_jobs = queued_jobs;
    }

    pub async fn snapshot(&self) -> RunnerGroupSnapshot {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl ControlPlaneClient for MemoryControlPlaneClient {
    async fn get_runner_group(&self) -> Result<RunnerGroupSnapshot, AppError> {
        Ok(self.state.read().await.clone())
    }

    async fn update_runner_status(&self, runner_id: &str, status: RunnerStatus) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        if let Some(runner) = state.runners.iter_mut().find(|r| r.runner_id == runner_id) {
            runner.status = status;
        }
        Ok(())
    }

    async fn deregister_runner(&self, runner_id: &str) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        state.runners.retain(|r| r.runner_id != runner_id);
        Ok(())
    }
}
