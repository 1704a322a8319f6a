use super::wire::{DeregisterRequest, RunnerGroupResponse, RunnerStatusUpdate};
use super::ControlPlaneClient;
use crate::domain::{RunnerGroupSnapshot, RunnerStatus};
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;

/// `reqwest`-backed control-plane client. Every non-2xx response fails
/// the tick.
pub struct HttpControlPlaneClient {
    http: Client,
    base_uri: String,
    org: String,
    runner_group: String,
    api_key: String,
}

impl HttpControlPlaneClient {
    pub fn new(base_uri: String, org: String, runner_group: String, api_key: String) -> Self {
        Self {
            http: Client::new(),
            base_uri,
            org,
            runner_group,
            api_key,
        }
    }

    fn auth_header(&self) -> String {
        format!("apikey {}", self.api_key)
    }

    fn runner_group_uri(&self) -> String {
        format!(
            "{}/api/v1/orgs/{}/runnergroups/{}/?getActiveWorkflows=true",
            self.base_uri, self.org, self.runner_group
        )
    }

    fn runner_status_uri(&self) -> String {
        format!(
            "{}/api/v1/orgs/{}/runnergroups/{}/runner_status/",
            self.base_uri, self.org, self.runner_group
        )
    }

    fn deregister_uri(&self) -> String {
        format!(
            "{}/api/v1/orgs/{}/runnergroups/{}/deregister/",
            self.base_uri, self.org, self.runner_group
        )
    }
}

#[async_trait]
impl ControlPlaneClient for HttpControlPlaneClient {
    async fn get_runner_group(&self) -> Result<RunnerGroupSnapshot, AppError> {
        let response = self
            .http
            .get(self.runner_group_uri())
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ControlPlaneError(format!(
                "GET runnergroup failed: HTTP {}",
                response.status()
            )));
        }

        let body: RunnerGroupResponse = response.json().await?;
        RunnerGroupSnapshot::try_from(body)
    }

    async fn update_runner_status(&self, runner_id: &str, status: RunnerStatus) -> Result<(), AppError> {
        let payload = RunnerStatusUpdate {
            status: status.as_wire_str(),
            runner_id,
        };

        let response = self
            .http
            .post(self.runner_status_uri())
            .header("Authorization", self.auth_header())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ControlPlaneError(format!(
                "POST runner_status failed: HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }

    async fn deregister_runner(&self, runner_id: &str) -> Result<(), AppError> {
        let payload = DeregisterRequest { runner_id };

        let response = self
            .http
            .post(self.deregister_uri())
            .header("Authorization", self.auth_header())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ControlPlaneError(format!(
                "POST deregister failed: HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }
}
