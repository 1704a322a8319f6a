use crate::cli::{Cli, Commands};
use crate::cloud_scaler::{AwsCloudScaler, AzureCloudScaler, CloudScaler, DryRunCloudScaler};
use crate::config::Config;
use crate::control_plane::{ControlPlaneClient, DryRunControlPlaneClient, HttpControlPlaneClient};
use crate::blob_store::{AzureBlobStore, BlobStore, S3BlobStore};
use crate::engine::ReconcileEngine;
use crate::error::AppError;
use colored::*;
use log::{error, info};
use serde::Serialize;

pub struct App;

#[derive(Debug, Serialize)]
struct TickResult {
    status_code: u16,
    body: String,
}

impl App {
    pub async fn run(cli: Cli) -> i32 {
        let config = match Config::from_env(cli.provider.into()) {
            Ok(config) => config,
            Err(err) => {
                error!("{err}");
                return 1;
            }
        };

        match cli.command {
            Commands::Reconcile { dry_run } => Self::run_reconcile(&config, dry_run).await,
            Commands::Serve { interval } => Self::run_serve(config, interval).await,
        }
    }

    async fn run_reconcile(config: &Config, dry_run: bool) -> i32 {
        let engine = match build_engine(config, dry_run).await {
            Ok(engine) => engine,
            Err(err) => {
                error!("{err}");
                return 1;
            }
        };

        let result = match engine.reconcile().await {
            Ok(()) => TickResult {
                status_code: 200,
                body: "success".to_string(),
            },
            Err(err) => TickResult {
                status_code: 500,
                body: err.to_string(),
            },
        };

        let exit_code = if result.status_code == 200 { 0 } else { 1 };
        match serde_json::to_string(&result) {
            Ok(json) => println!("{json}"),
            Err(_) => println!("{}", result.body),
        }
        exit_code
    }

    async fn run_serve(config: Config, interval: u64) -> i32 {
        info!(
            "{} polling every {interval}s for {} runner group '{}'",
            "runnerscaler".green(),
            config.provider,
            config.control_plane.runner_group
        );

        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval));
        loop {
            ticker.tick().await;

            let engine = match build_engine(&config, false).await {
                Ok(engine) => engine,
                Err(err) => {
                    error!("failed to build reconcile engine: {err}");
                    continue;
                }
            };

            if let Err(err) = engine.reconcile().await {
                error!("reconcile tick failed, will retry next interval: {err}");
            }
        }
    }
}

async fn build_engine(config: &Config, dry_run: bool) -> Result<ReconcileEngine, AppError> {
    let cloud: Box<dyn CloudScaler> = build_cloud_scaler(config, dry_run).await?;
    let control_plane: Box<dyn ControlPlaneClient> = build_control_plane(config, dry_run);
    Ok(ReconcileEngine::new(cloud, control_plane, config.policy.clone()))
}

async fn build_cloud_scaler(config: &Config, dry_run: bool) -> Result<Box<dyn CloudScaler>, AppError> {
    match config.provider {
        crate::config::CloudProviderKind::Aws => {
            let aws_cfg = config
                .aws
                .as_ref()
                .ok_or_else(|| AppError::ConfigurationError("missing AWS configuration".into()))?;

            let sdk_config = aws_config::from_env().load().await;
            let autoscaling = aws_sdk_autoscaling::Client::new(&sdk_config);
            let ec2 = aws_sdk_ec2::Client::new(&sdk_config);
            let s3 = aws_sdk_s3::Client::new(&sdk_config);

            let blob_store: Box<dyn BlobStore> =
                Box::new(S3BlobStore::new(s3, aws_cfg.bucket_name.clone()));

            let scaler = AwsCloudScaler::new(
                autoscaling,
                ec2,
                aws_cfg.asg_name.clone(),
                blob_store,
                config.scale_out_timestamp_blob_name.clone(),
                config.scale_in_timestamp_blob_name.clone(),
            );

            Ok(wrap_cloud_scaler(scaler, dry_run))
        }
        crate::config::CloudProviderKind::Azure => {
            let azure_cfg = config
                .azure
                .as_ref()
                .ok_or_else(|| AppError::ConfigurationError("missing Azure configuration".into()))?;

            let blob_store: Box<dyn BlobStore> = Box::new(AzureBlobStore::from_connection_string(
                &azure_cfg.blob_storage_conn_string,
                azure_cfg.blob_container_name.clone(),
            )?);

            let scaler = AzureCloudScaler::new(
                &azure_cfg.subscription_id,
                azure_cfg.resource_group_name.clone(),
                azure_cfg.vmss_name.clone(),
                blob_store,
                config.scale_out_timestamp_blob_name.clone(),
                config.scale_in_timestamp_blob_name.clone(),
            );

            Ok(wrap_cloud_scaler(scaler, dry_run))
        }
    }
}

fn wrap_cloud_scaler<C: CloudScaler + 'static>(scaler: C, dry_run: bool) -> Box<dyn CloudScaler> {
    if dry_run {
        Box::new(DryRunCloudScaler::new(scaler))
    } else {
        Box::new(scaler)
    }
}

fn build_control_plane(config: &Config, dry_run: bool) -> Box<dyn ControlPlaneClient> {
    let client = HttpControlPlaneClient::new(
        config.control_plane.base_uri.clone(),
        config.control_plane.org.clone(),
        config.control_plane.runner_group.clone(),
        config.control_plane.api_key.clone(),
    );

    if dry_run {
        Box::new(DryRunControlPlaneClient::new(client))
    } else {
        Box::new(client)
    }
}
