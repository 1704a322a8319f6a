use super::{read_cooldown_timestamp, write_cooldown_timestamp, CloudScaler};
use crate::blob_store::BlobStore;
use crate::domain::{CloudVm, Runner};
use crate::error::AppError;
use async_trait::async_trait;
use azure_identity::DefaultAzureCredential;
use azure_mgmt_compute::{
    models::{VirtualMachineScaleSetVm, VirtualMachineScaleSetVmProtectionPolicy},
    ComputeClient,
};
use chrono::{DateTime, Utc};
use log::warn;
use std::sync::Arc;

/// VMSS member management over `azure_mgmt_compute`.
/// Runner↔VM correlation is a hostname *prefix* match: the
/// runner's `computer_name` starts with the VM's `os_profile.computer_name`.
pub struct AzureCloudScaler {
    compute_client: ComputeClient,
    resource_group: String,
    vmss_name: String,
    blob_store: Box<dyn BlobStore>,
    scale_out_blob: String,
    scale_in_blob: String,
}

impl AzureCloudScaler {
    pub fn new(
        subscription_id: &str,
        resource_group: String,
        vmss_name: String,
        blob_store: Box<dyn BlobStore>,
        scale_out_blob: String,
        scale_in_blob: String,
    ) -> Self {
        let credential = Arc::new(DefaultAzureCredential::default());
        let compute_client = ComputeClient::new(subscription_id, credential);

        Self {
            compute_client,
            resource_group,
            vmss_name,
            blob_store,
            scale_out_blob,
            scale_in_blob,
        }
    }

    async fn list_vmss_vms(&self) -> Result<Vec<VirtualMachineScaleSetVm>, AppError> {
        self.compute_client
            .virtual_machine_scale_set_vms()
            .list(&self.resource_group, &self.vmss_name)
            .await
            .map_err(|e| AppError::AzureError(e.to_string()))
    }

    async fn find_by_computer_name(
        &self,
        computer_name: &str,
    ) -> Result<Option<VirtualMachineScaleSetVm>, AppError> {
        let vms = self.list_vmss_vms().await?;
        Ok(vms.into_iter().find(|vm| {
            vm.properties
                .as_ref()
                .and_then(|p| p.os_profile.as_ref())
                .and_then(|os| os.computer_name.as_ref())
                .map(|vm_computer_name| computer_name.starts_with(vm_computer_name.as_str()))
                .unwrap_or(false)
        }))
    }

    async fn set_protection(&self, runner: &Runner, protect: bool) -> Result<(), AppError> {
        let Some(mut vm) = self.find_by_computer_name(&runner.computer_name).await? else {
            warn!(
                "no Azure VM correlates to runner computer name '{}'; skipping protection toggle",
                runner.computer_name
            );
            return Ok(());
        };

        if is_protected(&vm) == protect {
            return Ok(());
        }

        let instance_id = vm.instance_id.clone().unwrap_or_default();
        if let Some(props) = vm.properties.as_mut() {
            props.protection_policy = Some(VirtualMachineScaleSetVmProtectionPolicy {
                protect_from_scale_in: Some(protect),
                ..Default::default()
            });
        }

        self.compute_client
            .virtual_machine_scale_set_vms()
            .update(&self.resource_group, &self.vmss_name, &instance_id, vm)
            .await
            .map_err(|e| AppError::AzureError(e.to_string()))?;

        Ok(())
    }
}

fn is_protected(vm: &VirtualMachineScaleSetVm) -> bool {
    vm.properties
        .as_ref()
        .and_then(|p| p.protection_policy.as_ref())
        .and_then(|pp| pp.protect_from_scale_in)
        .unwrap_or(false)
}

#[async_trait]
impl CloudScaler for AzureCloudScaler {
    async fn list_members(&self) -> Result<Vec<CloudVm>, AppError> {
        Ok(self
            .list_vmss_vms()
            .await?
            .into_iter()
            .filter_map(|vm| {
                let hostname = vm
                    .properties
                    .as_ref()?
                    .os_profile
                    .as_ref()?
                    .computer_name
                    .clone()?;
                Some(CloudVm {
                    hostname,
                    protected_from_scale_in: is_protected(&vm),
                })
            })
            .collect())
    }

    async fn set_desired_capacity(&self, n: u32) -> Result<(), AppError> {
        let mut vmss = self
            .compute_client
            .virtual_machine_scale_sets()
            .get(&self.resource_group, &self.vmss_name)
            .await
            .map_err(|e| AppError::AzureError(e.to_string()))?;

        if let Some(sku) = vmss.sku.as_mut() {
            sku.capacity = Some(n as i64);
        }

        self.compute_client
            .virtual_machine_scale_sets()
            .update(&self.resource_group, &self.vmss_name, vmss)
            .await
            .map_err(|e| AppError::AzureError(e.to_string()))?;

        Ok(())
    }

    async fn add_scale_in_protection(&self, runner: &Runner) -> Result<(), AppError> {
        self.set_protection(runner, true).await
    }

    async fn remove_scale_in_protection(&self, runner: &Runner) -> Result<(), AppError> {
        self.set_protection(runner, false).await
    }

    async fn count_existing_vms(&self) -> Result<u32, AppError> {
        let vmss = self
            .compute_client
            .virtual_machine_scale_sets()
            .get(&self.resource_group, &self.vmss_name)
            .await
            .map_err(|e| AppError::AzureError(e.to_string()))?;

        Ok(vmss
            .sku
            .as_ref()
            .and_then(|sku| sku.capacity)
            .unwrap_or(0) as u32)
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
