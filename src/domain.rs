//! Core snapshot types the reconciliation engine reasons about.
//!
//! Everything here is an immutable value captured once per tick (see
//! `engine::ReconcileEngine`). Wire-format deserialization lives in
//! `control_plane`; this module only knows the shapes the engine consumes.

use serde::{Deserialize, Serialize};

/// Status of a runner as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunnerStatus {
    Active,
    Draining,
    /// Any status string the control plane reports that isn't ACTIVE or
    /// DRAINING (e.g. a provisioning state). Not acted on by the engine.
    Other(String),
}

impl RunnerStatus {
    pub fn as_wire_str(&self) -> &str {
        match self {
            RunnerStatus::Active => "ACTIVE",
            RunnerStatus::Draining => "DRAINING",
            RunnerStatus::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for RunnerStatus {
    fn from(value: &str) -> Self {
        match value {
            "ACTIVE" => RunnerStatus::Active,
            "DRAINING" => RunnerStatus::Draining,
            other => RunnerStatus::Other(other.to_string()),
        }
    }
}

/// An immutable per-tick snapshot of a single runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runner {
    pub runner_id: String,
    pub computer_name: String,
    pub status: RunnerStatus,
    pub running_tasks: u32,
    pub pending_tasks: u32,
    pub agent_connected: bool,
}

impl Runner {
    pub fn is_idle(&self) -> bool {
        self.running_tasks == 0 && self.pending_tasks == 0
    }
}

/// A fresh-as-of-entry view of the runner group, pulled once per tick.
#[derive(Debug, Clone)]
pub struct RunnerGroupSnapshot {
    pub runners: Vec<Runner>,
    pub queued_jobs: u64,
}

impl RunnerGroupSnapshot {
    pub fn draining(&self) -> Vec<&Runner> {
        self.runners
            .iter()
            .filter(|r| r.status == RunnerStatus::Draining)
            .collect()
    }
}

/// A cloud VM as seen by the scale set, opaque to the engine except for
/// the fields used for runner correlation and protection.
#[derive(Debug, Clone)]
pub struct CloudVm {
    pub hostname: String,
    pub protected_from_scale_in: bool,
}
