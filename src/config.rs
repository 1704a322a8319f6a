//! Typed configuration parsed once at engine construction from the
//! process environment, centralized into a single fallible constructor
//! rather than scattering `std::env::var` calls through the call sites.

use crate::error::AppError;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudProviderKind {
    Aws,
    Azure,
}

impl std::fmt::Display for CloudProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloudProviderKind::Aws => write!(f, "aws"),
            CloudProviderKind::Azure => write!(f, "azure"),
        }
    }
}

/// Control-plane connection settings, common to both cloud backends.
#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    pub base_uri: String,
    pub api_key: String,
    pub org: String,
    pub runner_group: String,
}

/// Threshold/step/cooldown policy driving the reconciliation decision.
#[derive(Debug, Clone)]
pub struct ScalingPolicy {
    pub scale_out_threshold: u64,
    pub scale_in_threshold: u64,
    pub scale_out_step: u32,
    pub scale_in_step: u32,
    pub scale_out_cooldown: Duration,
    pub scale_in_cooldown: Duration,
    pub min_runners: u32,
}

#[derive(Debug, Clone)]
pub struct AwsConfig {
    pub asg_name: String,
    pub bucket_name: String,
}

#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub vmss_name: String,
    pub blob_storage_conn_string: String,
    pub blob_container_name: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub provider: CloudProviderKind,
    pub control_plane: ControlPlaneConfig,
    pub policy: ScalingPolicy,
    pub scale_in_timestamp_blob_name: String,
    pub scale_out_timestamp_blob_name: String,
    pub aws: Option<AwsConfig>,
    pub azure: Option<AzureConfig>,
}

fn required(key: &str) -> Result<String, AppError> {
    env::var(key).map_err(|_| AppError::ConfigurationError(format!("missing required env var {key}")))
}

fn required_u64(key: &str) -> Result<u64, AppError> {
    required(key)?
        .parse()
        .map_err(|_| AppError::ConfigurationError(format!("{key} is not a valid integer")))
}

fn required_u32(key: &str) -> Result<u32, AppError> {
    required(key)?
        .parse()
        .map_err(|_| AppError::ConfigurationError(format!("{key} is not a valid integer")))
}

fn required_minutes(key: &str) -> Result<Duration, AppError> {
    let minutes = required_u64(key)?;
    Ok(Duration::from_secs(minutes * 60))
}

impl Config {
    /// Parses and validates the full configuration from the process
    /// environment. Any unparseable integer or missing required key is a
    /// fatal configuration error.
    pub fn from_env(provider: CloudProviderKind) -> Result<Self, AppError> {
        let control_plane = ControlPlaneConfig {
            base_uri: required("SG_BASE_URI")?,
            api_key: required("SG_API_KEY")?,
            org: required("SG_ORG")?,
            runner_group: required("SG_RUNNER_GROUP")?,
        };

        let policy = ScalingPolicy {
            scale_out_threshold: required_u64("SCALE_OUT_THRESHOLD")?,
            scale_in_threshold: required_u64("SCALE_IN_THRESHOLD")?,
            scale_out_step: required_u32("SCALE_OUT_STEP")?,
            scale_in_step: required_u32("SCALE_IN_STEP")?,
            scale_out_cooldown: required_minutes("SCALE_OUT_COOLDOWN_DURATION")?,
            scale_in_cooldown: required_minutes("SCALE_IN_COOLDOWN_DURATION")?,
            min_runners: env::var("MIN_RUNNERS")
                .ok()
                .map(|v| {
                    v.parse()
                        .map_err(|_| AppError::ConfigurationError("MIN_RUNNERS is not a valid integer".into()))
                })
                .transpose()?
                .unwrap_or(0),
        };

        let scale_in_timestamp_blob_name = required("SCALE_IN_TIMESTAMP_BLOB_NAME")?;
        let scale_out_timestamp_blob_name = required("SCALE_OUT_TIMESTAMP_BLOB_NAME")?;

        let (aws, azure) = match provider {
            CloudProviderKind::Aws => (
                Some(AwsConfig {
                    asg_name: required("AWS_ASG_NAME")?,
                    bucket_name: required("AWS_BUCKET_NAME")?,
                }),
                None,
            ),
            CloudProviderKind::Azure => (
                None,
                Some(AzureConfig {
                    subscription_id: required("AZURE_SUBSCRIPTION_ID")?,
                    resource_group_name: required("AZURE_RESOURCE_GROUP_NAME")?,
                    vmss_name: required("AZURE_VMSS_NAME")?,
                    blob_storage_conn_string: required("AZURE_BLOB_STORAGE_CONN_STRING")?,
                    blob_container_name: required("AZURE_BLOB_CONTAINER_NAME")?,
                }),
            ),
        };

        Ok(Config {
            provider,
            control_plane,
            policy,
            scale_in_timestamp_blob_name,
            scale_out_timestamp_blob_name,
            aws,
            azure,
        })
    }
}
