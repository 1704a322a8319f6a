use super::{read_cooldown_timestamp, write_cooldown_timestamp, CloudScaler};
use crate::blob_store::BlobStore;
use crate::domain::{CloudVm, Runner};
use crate::error::AppError;
use async_trait::async_trait;
use aws_sdk_autoscaling::Client as AutoScalingClient;
use aws_sdk_ec2::Client as Ec2Client;
use chrono::{DateTime, Utc};
use log::warn;

/// An ASG member correlated across `describe_auto_scaling_groups` (which
/// knows protection status) and `describe_instances` (which knows
/// `PrivateDnsName`, used as the correlation hostname.
struct AwsInstance {
    instance_id: String,
    hostname: String,
    protected_from_scale_in: bool,
}

pub struct AwsCloudScaler {
    autoscaling: AutoScalingClient,
    ec2: Ec2Client,
    asg_name: String,
    blob_store: Box<dyn BlobStore>,
    scale_out_blob: String,
    scale_in_blob: String,
}

impl AwsCloudScaler {
    pub fn new(
        autoscaling: AutoScalingClient,
        ec2: Ec2Client,
        asg_name: String,
        blob_store: Box<dyn BlobStore>,
        scale_out_blob: String,
        scale_in_blob: String,
    ) -> Self {
        Self {
            autoscaling,
            ec2,
            asg_name,
            blob_store,
            scale_out_blob,
            scale_in_blob,
        }
    }

    async fn list_instances(&self) -> Result<Vec<AwsInstance>, AppError> {
        let response = self
            .autoscaling
            .describe_auto_scaling_groups()
            .auto_scaling_group_names(&self.asg_name)
            .send()
            .await
            .map_err(|e| AppError::AwsError(e.to_string()))?;

        let Some(group) = response.auto_scaling_groups().first() else {
            warn!("Auto Scaling Group '{}' not found", self.asg_name);
            return Ok(Vec::new());
        };

        let protection_by_id: std::collections::HashMap<String, bool> = group
            .instances()
            .iter()
            .filter_map(|i| {
                i.instance_id()
                    .map(|id| (id.to_string(), i.protected_from_scale_in().unwrap_or(false)))
            })
            .collect();

        let instance_ids: Vec<String> = protection_by_id.keys().cloned().collect();
        if instance_ids.is_empty() {
            return Ok(Vec::new());
        }

        let describe = self
            .ec2
            .describe_instances()
            .set_instance_ids(Some(instance_ids))
            .send()
            .await
            .map_err(|e| AppError::AwsError(e.to_string()))?;

        let mut instances = Vec::new();
        for reservation in describe.reservations() {
            for instance in reservation.instances() {
                let Some(instance_id) = instance.instance_id() else {
                    continue;
                };
                let Some(hostname) = instance.private_dns_name() else {
                    continue;
                };
                instances.push(AwsInstance {
                    instance_id: instance_id.to_string(),
                    hostname: hostname.to_string(),
                    protected_from_scale_in: protection_by_id
                        .get(instance_id)
                        .copied()
                        .unwrap_or(false),
                });
            }
        }

        Ok(instances)
    }

    async fn find_by_computer_name(&self, computer_name: &str) -> Result<Option<AwsInstance>, AppError> {
        let instances = self.list_instances().await?;
        Ok(instances
            .into_iter()
            .find(|i| i.hostname == computer_name))
    }

    async fn set_protection(&self, runner: &Runner, protect: bool) -> Result<(), AppError> {
        let Some(instance) = self.find_by_computer_name(&runner.computer_name).await? else {
            warn!(
                "no AWS instance correlates to runner computer name '{}'; skipping protection toggle",
                runner.computer_name
            );
            return Ok(());
        };

        if instance.protected_from_scale_in == protect {
            return Ok(());
        }

        self.autoscaling
            .set_instance_protection()
            .auto_scaling_group_name(&self.asg_name)
            .instance_ids(&instance.instance_id)
            .protected_from_scale_in(protect)
            .send()
            .await
            .map_err(|e| AppError::AwsError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl CloudScaler for AwsCloudScaler {
    async fn list_members(&self) -> Result<Vec<CloudVm>, AppError> {
        Ok(self
            .list_instances()
            .await?
            .into_iter()
            .map(|i| CloudVm {
                hostname: i.hostname,
                protected_from_scale_in: i.protected_from_scale_in,
            })
            .collect())
    }

    async fn set_desired_capacity(&self, n: u32) -> Result<(), AppError> {
        self.autoscaling
            .set_desired_capacity()
            .auto_scaling_group_name(&self.asg_name)
            .desired_capacity(n as i32)
            .send()
            .await
            .map_err(|e| AppError::AwsError(e.to_string()))?;
        Ok(())
    }

    async fn add_scale_in_protection(&self, runner: &Runner) -> Result<(), AppError> {
        self.set_protection(runner, true).await
    }

    async fn remove_scale_in_protection(&self, runner: &Runner) -> Result<(), AppError> {
        self.set_protection(runner, false).await
    }

    async fn count_existing_vms(&self) -> Result<u32, AppError> {
        Ok(self.list_instances().await?.len() as u32)
    }

    async fn get_last_scale_out_event(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        read_cooldown_timestamp(self.blob_store.as_ref(), &self.scale_out_blob).await
    }

    async fn set_last_scale_out_event(&self, timestamp: DateTime<Utc>) -> Result<(), AppError> {
        write_cooldown_timestamp(self.blob_store.as_ref(), &self.scale_out_blob, timestamp).await
    }

    async fn get_last_scale_in_event(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        read_cooldown_timestamp(self.blob_store.as_ref(), &self.scale_in_blob).await
    }

    async fn set_last_scale_in_event(&self, timestamp: DateTime<Utc>) -> Result<(), AppError> {
        write_cooldown_timestamp(self.blob_store.as_ref(), &self.scale_in_blob, timestamp).await
    }
}
