//! The reconciliation decision core. Consumes a
//! `CloudScaler` and `ControlPlaneClient` and executes one
//! `reconcile()` pass per call: classify the action, consult cooldown,
//! mutate protection/status/capacity, and persist the cooldown
//! timestamp on success.

use crate::cloud_scaler::CloudScaler;
use crate::config::ScalingPolicy;
use crate::control_plane::ControlPlaneClient;
use crate::domain::{Runner, RunnerStatus};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use log::{debug, info};

pub struct ReconcileEngine {
    cloud: Box<dyn CloudScaler>,
    control_plane: Box<dyn ControlPlaneClient>,
    policy: ScalingPolicy,
}

impl ReconcileEngine {
    pub fn new(
        cloud: Box<dyn CloudScaler>,
        control_plane: Box<dyn ControlPlaneClient>,
        policy: ScalingPolicy,
    ) -> Self {
        Self {
            cloud,
            control_plane,
            policy,
        }
    }

    /// Runs exactly one reconciliation pass. Any external failure aborts
    /// the tick without updating cooldown state, so the next tick
    /// retries the same decision.
    pub async fn reconcile(&self) -> Result<(), AppError> {
        let snapshot = self.control_plane.get_runner_group().await?;

        info!(
            "reconcile: queued_jobs={} runners={}",
            snapshot.queued_jobs,
            snapshot.runners.len()
        );

        let should_scale_out = snapshot.queued_jobs >= self.policy.scale_out_threshold
            || (snapshot.runners.len() as u32) < self.policy.min_runners
            || (snapshot.queued_jobs > 0 && snapshot.runners.is_empty());

        if should_scale_out {
            self.scale_out().await?;
            self.terminate().await?;
        } else if snapshot.queued_jobs <= self.policy.scale_in_threshold {
            self.scale_in(self.policy.scale_in_step).await?;
            self.terminate().await?;
        } else {
            self.terminate().await?;
        }

        Ok(())
    }

    /// Reactivation-first scale-out. Cooldown is gated on
    /// `SCALE_OUT_COOLDOWN` — draining runners are reactivated before any
    /// new capacity is requested.
    async fn scale_out(&self) -> Result<(), AppError> {
        let now = Utc::now();

        if let Some(last) = self.cloud.get_last_scale_out_event().await? {
            if within_cooldown(now, last, self.policy.scale_out_cooldown) {
                debug!("scale_out: skipping, cooldown active since {last}");
                return Ok(());
            }
        }

        let snapshot = self.control_plane.get_runner_group().await?;
        let draining: Vec<&Runner> = snapshot.draining();
        let step = self.policy.scale_out_step;

        let mut scaled_out = false;

        if draining.len() as u32 >= step {
            for runner in draining.into_iter().take(step as usize) {
                self.control_plane
                    .update_runner_status(&runner.runner_id, RunnerStatus::Active)
                    .await?;
            }
            scaled_out = true;
        } else {
            let reactivated = draining.len() as u32;
            for runner in draining {
                self.control_plane
                    .update_runner_status(&runner.runner_id, RunnerStatus::Active)
                    .await?;
            }
            let current = self.cloud.count_existing_vms().await?;
            self.cloud
                .set_desired_capacity(current + step - reactivated)
                .await?;
            scaled_out = true;
        }

        if scaled_out {
            info!("scale_out: scaled out, recording cooldown");
            self.cloud.set_last_scale_out_event(now).await?;
        }

        Ok(())
    }

    /// Protect-then-drain scale-in. Does not reduce
    /// desired capacity directly; capacity only shrinks in `terminate()`
    /// once drained runners quiesce.
    async fn scale_in(&self, step: u32) -> Result<(), AppError> {
        let snapshot = self.control_plane.get_runner_group().await?;
        if snapshot.runners.is_empty() {
            debug!("scale_in: no runners exist to scale in");
            return Ok(());
        }

        let now = Utc::now();
        if let Some(last) = self.cloud.get_last_scale_in_event().await? {
            if within_cooldown(now, last, self.policy.scale_in_cooldown) {
                debug!("scale_in: skipping, cooldown active since {last}");
                return Ok(());
            }
        }

        for runner in &snapshot.runners {
            self.cloud.add_scale_in_protection(runner).await?;
        }

        let draining_count = snapshot.draining().len() as u32;
        let drainable = snapshot.runners.len() as i64
            - draining_count as i64
            - self.policy.min_runners as i64;

        if drainable <= 0 {
            debug!("scale_in: nothing drainable (drainable={drainable})");
            return Ok(());
        }

        let mut drain_count = step.min(drainable as u32);
        let mut scaled_in = false;

        for runner in &snapshot.runners {
            if drain_count == 0 {
                break;
            }
            if runner.status != RunnerStatus::Draining {
                self.control_plane
                    .update_runner_status(&runner.runner_id, RunnerStatus::Draining)
                    .await?;
                drain_count -= 1;
                scaled_in = true;
            }
        }

        if scaled_in {
            info!("scale_in: drained runners, recording cooldown");
            self.cloud.set_last_scale_in_event(now).await?;
        }

        Ok(())
    }

    /// Deregisters drained, idle runners and shrinks desired capacity by
    /// however many were terminated.
    async fn terminate(&self) -> Result<(), AppError> {
        let snapshot = self.control_plane.get_runner_group().await?;

        let mut terminated = 0u32;
        for runner in snapshot.draining() {
            if runner.is_idle() {
                self.cloud.remove_scale_in_protection(runner).await?;
                self.control_plane.deregister_runner(&runner.runner_id).await?;
                terminated += 1;
            }
        }

        if terminated > 0 {
            let current = self.cloud.count_existing_vms().await?;
            let target = current.saturating_sub(terminated);
            info!("terminate: deregistered {terminated} runner(s), desired capacity -> {target}");
            self.cloud.set_desired_capacity(target).await?;
        }

        Ok(())
    }
}

fn within_cooldown(now: DateTime<Utc>, last: DateTime<Utc>, cooldown: std::time::Duration) -> bool {
    let elapsed = now.signed_duration_since(last);
    elapsed < chrono::Duration::from_std(cooldown).unwrap_or(chrono::Duration::zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud_scaler::MemoryCloudScaler;
    use crate::control_plane::MemoryControlPlaneClient;
    use crate::domain::CloudVm;
    use std::time::Duration;

    fn policy() -> ScalingPolicy {
        ScalingPolicy {
            scale_out_threshold: 5,
            scale_in_threshold: 0,
            scale_out_step: 3,
            scale_in_step: 2,
            scale_out_cooldown: Duration::from_secs(300),
            scale_in_cooldown: Duration::from_secs(300),
            min_runners: 0,
        }
    }

    fn runner(id: &str, status: RunnerStatus, running: u32, pending: u32) -> Runner {
        Runner {
            runner_id: id.to_string(),
            computer_name: format!("vm-{id}"),
            status,
            running_tasks: running,
            pending_tasks: pending,
            agent_connected: true,
        }
    }

    fn vm(runner_id: &str) -> CloudVm {
        CloudVm {
            hostname: format!("vm-{runner_id}"),
            protected_from_scale_in: false,
        }
    }

    fn engine(runners: Vec<Runner>, queued_jobs: u64, members: Vec<CloudVm>, capacity: u32) -> (ReconcileEngine, std::sync::Arc<MemoryControlPlaneClient>, std::sync::Arc<MemoryCloudScaler>) {
        let control_plane = std::sync::Arc::new(MemoryControlPlaneClient::new(runners, queued_jobs));
        let cloud = std::sync::Arc::new(MemoryCloudScaler::new(members, capacity));
        let engine = ReconcileEngine::new(
            Box::new(ArcCloudScaler(cloud.clone())),
            Box::new(ArcControlPlaneClient(control_plane.clone())),
            policy(),
        );
        (engine, control_plane, cloud)
    }

    // Thin pass-through wrappers so the test fakes can be shared (via Arc)
    // between the engine and post-hoc assertions.
    struct ArcCloudScaler(std::sync::Arc<MemoryCloudScaler>);
    struct ArcControlPlaneClient(std::sync::Arc<MemoryControlPlaneClient>);

    #[async_trait::async_trait]
    impl crate::cloud_scaler::CloudScaler for ArcCloudScaler {
        async fn list_members(&self) -> Result<Vec<CloudVm>, AppError> {
            self.0.list_members().await
        }
        async fn set_desired_capacity(&self, n: u32) -> Result<(), AppError> {
            self.0.set_desired_capacity(n).await
        }
        async fn add_scale_in_protection(&self, runner: &Runner) -> Result<(), AppError> {
            self.0.add_scale_in_protection(runner).await
        }
        async fn remove_scale_in_protection(&self, runner: &Runner) -> Result<(), AppError> {
            self.0.remove_scale_in_protection(runner).await
        }
        async fn count_existing_vms(&self) -> Result<u32, AppError> {
            self.0.count_existing_vms().await
        }
        async fn get_last_scale_out_event(&self) -> Result<Option<DateTime<Utc>>, AppError> {
            self.0.get_last_scale_out_event().await
        }
        async fn set_last_scale_out_event(&self, timestamp: DateTime<Utc>) -> Result<(), AppError> {
            self.0.set_last_scale_out_event(timestamp).await
        }
        async fn get_last_scale_in_event(&self) -> Result<Option<DateTime<Utc>>, AppError> {
            self.0.get_last_scale_in_event().await
        }
        async fn set_last_scale_in_event(&self, timestamp: DateTime<Utc>) -> Result<(), AppError> {
            self.0.set_last_scale_in_event(timestamp).await
        }
    }

    #[async_trait::async_trait]
    impl crate::control_plane::ControlPlaneClient for ArcControlPlaneClient {
        async fn get_runner_group(&self) -> Result<crate::domain::RunnerGroupSnapshot, AppError> {
            self.0.get_runner_group().await
        }
        async fn update_runner_status(&self, runner_id: &str, status: RunnerStatus) -> Result<(), AppError> {
            self.0.update_runner_status(runner_id, status).await
        }
        async fn deregister_runner(&self, runner_id: &str) -> Result<(), AppError> {
            self.0.deregister_runner(runner_id).await
        }
    }

    #[tokio::test]
    async fn scale_out_grows_capacity_when_queue_exceeds_threshold() {
        let runners = vec![runner("1", RunnerStatus::Active, 1, 0)];
        let members = vec![vm("1")];
        let (engine, _cp, cloud) = engine(runners, 10, members, 1);

        engine.reconcile().await.unwrap();

        assert_eq!(cloud.desired_capacity().await, 4); // current(1) + step(3)
    }

    #[tokio::test]
    async fn scale_out_reactivates_draining_runners_before_growing_capacity() {
        let runners = vec![
            runner("1", RunnerStatus::Draining, 0, 0),
            runner("2", RunnerStatus::Draining, 0, 0),
            runner("3", RunnerStatus::Active, 1, 0),
        ];
        let members = vec![vm("1"), vm("2"), vm("3")];
        let (engine, cp, cloud) = engine(runners, 10, members, 3);

        engine.reconcile().await.unwrap();

        // step=3, 2 draining reactivated, capacity grows by the remaining 1.
        assert_eq!(cloud.desired_capacity().await, 4);
        let snapshot = cp.snapshot().await;
        assert!(snapshot.runners.iter().all(|r| r.status == RunnerStatus::Active));
    }

    #[tokio::test]
    async fn scale_out_reactivates_only_when_draining_covers_the_whole_step() {
        let runners = vec![
            runner("1", RunnerStatus::Draining, 0, 0),
            runner("2", RunnerStatus::Draining, 0, 0),
            runner("3", RunnerStatus::Draining, 0, 0),
            runner("4", RunnerStatus::Active, 1, 0),
        ];
        let members = vec![vm("1"), vm("2"), vm("3"), vm("4")];
        let (engine, cp, cloud) = engine(runners, 10, members, 4);

        engine.reconcile().await.unwrap();

        // step=3, exactly 3 draining runners reactivated, capacity untouched.
        assert_eq!(cloud.desired_capacity().await, 4);
        let snapshot = cp.snapshot().await;
        assert_eq!(snapshot.draining().len(), 0);
    }

    #[tokio::test]
    async fn scale_out_respects_cooldown() {
        let runners = vec![runner("1", RunnerStatus::Active, 1, 0)];
        let members = vec![vm("1")];
        let (engine, _cp, cloud) = engine(runners, 10, members, 1);

        cloud.set_last_scale_out_event(Utc::now()).await.unwrap();
        engine.reconcile().await.unwrap();

        assert_eq!(cloud.desired_capacity().await, 1);
    }

    #[tokio::test]
    async fn scale_in_protects_all_runners_then_drains_up_to_step() {
        // Still-running tasks on the first two runners mean terminate()
        // won't immediately reap them once drained, so the DRAINING
        // transition is observable after a full reconcile pass.
        let runners = vec![
            runner("1", RunnerStatus::Active, 1, 0),
            runner("2", RunnerStatus::Active, 1, 0),
            runner("3", RunnerStatus::Active, 0, 0),
            runner("4", RunnerStatus::Active, 0, 0),
        ];
        let members = vec![vm("1"), vm("2"), vm("3"), vm("4")];
        let (engine, cp, cloud) = engine(runners, 0, members, 4);

        engine.reconcile().await.unwrap();

        let snapshot = cp.snapshot().await;
        assert_eq!(snapshot.draining().len(), 2); // scale_in_step=2
        let all_members = cloud.list_members().await.unwrap();
        assert!(all_members.iter().all(|m| m.protected_from_scale_in));
    }

    #[tokio::test]
    async fn scale_in_does_not_drain_below_min_runners() {
        let mut p = policy();
        p.min_runners = 4;
        let runners = vec![
            runner("1", RunnerStatus::Active, 0, 0),
            runner("2", RunnerStatus::Active, 0, 0),
            runner("3", RunnerStatus::Active, 0, 0),
            runner("4", RunnerStatus::Active, 0, 0),
        ];
        let members = vec![vm("1"), vm("2"), vm("3"), vm("4")];
        let control_plane = std::sync::Arc::new(MemoryControlPlaneClient::new(runners, 0));
        let cloud = std::sync::Arc::new(MemoryCloudScaler::new(members, 4));
        let engine = ReconcileEngine::new(
            Box::new(ArcCloudScaler(cloud.clone())),
            Box::new(ArcControlPlaneClient(control_plane.clone())),
            p,
        );

        engine.reconcile().await.unwrap();

        let snapshot = control_plane.snapshot().await;
        assert_eq!(snapshot.draining().len(), 0);
    }

    #[tokio::test]
    async fn terminate_deregisters_idle_draining_runners_and_shrinks_capacity() {
        let runners = vec![
            runner("1", RunnerStatus::Draining, 0, 0),
            runner("2", RunnerStatus::Draining, 1, 0), // still busy, not terminated
            runner("3", RunnerStatus::Active, 0, 0),
        ];
        let members = vec![vm("1"), vm("2"), vm("3")];
        // queued_jobs sits strictly between scale_in_threshold(0) and
        // scale_out_threshold(5), so reconcile only runs terminate().
        let (engine, cp, cloud) = engine(runners, 2, members, 3);

        engine.reconcile().await.unwrap();

        let snapshot = cp.snapshot().await;
        assert!(snapshot.runners.iter().all(|r| r.runner_id != "1"));
        assert!(snapshot.runners.iter().any(|r| r.runner_id == "2"));
        assert_eq!(cloud.desired_capacity().await, 2);
    }

    #[tokio::test]
    async fn reconcile_is_idempotent_when_nothing_changes() {
        let runners = vec![runner("1", RunnerStatus::Active, 1, 0)];
        let members = vec![vm("1")];
        // queued_jobs sits strictly between the two thresholds and there
        // are no draining runners, so neither scale_out nor scale_in nor
        // terminate should mutate anything.
        let (engine, _cp, cloud) = engine(runners, 2, members, 1);

        engine.reconcile().await.unwrap();
        let after_first = cloud.desired_capacity().await;
        engine.reconcile().await.unwrap();
        let after_second = cloud.desired_capacity().await;

        assert_eq!(after_first, after_second);
    }

    #[tokio::test]
    async fn scale_out_with_no_runners_and_queued_jobs_grows_from_zero() {
        let runners = vec![];
        let members = vec![];
        let (engine, _cp, cloud) = engine(runners, 1, members, 0);

        engine.reconcile().await.unwrap();

        assert_eq!(cloud.desired_capacity().await, 3); // 0 + scale_out_step
    }

    #[tokio::test]
    async fn reconcile_switches_from_scale_out_to_scale_in_as_the_queue_drains() {
        // Queue starts hot: the first tick scales out. Once the queue
        // drains between ticks, the next tick should drain a runner
        // instead, without needing a fresh engine or fakes.
        let runners = vec![runner("1", RunnerStatus::Active, 1, 0)];
        let members = vec![vm("1")];
        let (engine, cp, cloud) = engine(runners, 10, members, 1);

        engine.reconcile().await.unwrap();
        assert_eq!(cloud.desired_capacity().await, 4); // current(1) + step(3)

        cp.set_queued_jobs(0).await;
        engine.reconcile().await.unwrap();

        let snapshot = cp.snapshot().await;
        assert_eq!(snapshot.draining().len(), 1);
    }
}
