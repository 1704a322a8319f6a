//! JSON wire shapes for the control-plane REST surface.

use crate::domain::{Runner, RunnerGroupSnapshot, RunnerStatus};
use crate::error::AppError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RunnerGroupResponse {
    pub msg: RunnerGroupMsg,
}

#[derive(Debug, Deserialize)]
pub struct RunnerGroupMsg {
    #[serde(rename = "ContainerInstances")]
    pub container_instances: Vec<ContainerInstance>,
    #[serde(rename = "QueuedWorkflowsCount")]
    pub queued_workflows_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ContainerInstance {
    #[serde(rename = "runnerId")]
    pub runner_id: String,
    pub status: String,
    #[serde(rename = "runningTasksCount")]
    pub running_tasks_count: u32,
    #[serde(rename = "pendingTasksCount")]
    pub pending_tasks_count: u32,
    #[serde(rename = "agentConnected")]
    pub agent_connected: bool,
    #[serde(rename = "instanceDetails")]
    pub instance_details: Vec<InstanceDetail>,
}

#[derive(Debug, Deserialize)]
pub struct InstanceDetail {
    #[serde(rename = "ComputerName")]
    pub computer_name: String,
    #[serde(rename = "IPAddress")]
    #[allow(dead_code)]
    pub ip_address: Option<String>,
    #[serde(rename = "ContainerName")]
    #[allow(dead_code)]
    pub container_name: Option<String>,
}

impl From<ContainerInstance> for Runner {
    fn from(instance: ContainerInstance) -> Self {
        let computer_name = instance
            .instance_details
            .first()
            .map(|d| d.computer_name.clone())
            .unwrap_or_default();

        Runner {
            runner_id: instance.runner_id,
            computer_name,
            status: RunnerStatus::from(instance.status.as_str()),
            running_tasks: instance.running_tasks_count,
            pending_tasks: instance.pending_tasks_count,
            agent_connected: instance.agent_connected,
        }
    }
}

impl TryFrom<RunnerGroupResponse> for RunnerGroupSnapshot {
    type Error = AppError;

    fn try_from(response: RunnerGroupResponse) -> Result<Self, Self::Error> {
        let queued_jobs = response
            .msg
            .queued_workflows_count
            .ok_or_else(|| AppError::SchemaViolation("QueuedWorkflowsCount".to_string()))?;

        let runners = response
            .msg
            .container_instances
            .into_iter()
            .map(Runner::from)
            .collect();

        Ok(RunnerGroupSnapshot {
            runners,
            queued_jobs,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RunnerStatusUpdate<'a> {
    #[serde(rename = "Status")]
    pub status: &'a str,
    #[serde(rename = "RunnerId")]
    pub runner_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct DeregisterRequest<'a> {
    #[serde(rename = "RunnerId")]
    pub runner_id: &'a str,
}
