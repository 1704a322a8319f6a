use clap::{Parser, Subcommand, ValueEnum};
use std::fmt;

#[derive(Parser)]
#[command(
    name = "runnerscaler",
    about = "Autoscaling controller reconciling a runner fleet's cloud scale set against a job queue.",
    version,
    long_about = "Reconciles a pool of worker VMs ('runners') executing queued jobs for a control plane \
                   toward a target capacity on AWS Auto Scaling Groups or Azure VM Scale Sets, while \
                   protecting in-flight work from termination."
)]
pub struct Cli {
    /// Cloud provider backing the scale set
    #[arg(value_enum, long, global = true, default_value_t = CloudProvider::Aws)]
    pub provider: CloudProvider,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run exactly one reconciliation tick and exit
    Reconcile {
        /// Log the action that would be taken without mutating anything
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Run reconciliation on a fixed interval, standing in for a
    /// timer-trigger/cron invocation environment
    Serve {
        /// Seconds between reconciliation ticks
        #[arg(short, long, default_value_t = 60)]
        interval: u64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloudProvider {
    Aws,
    Azure,
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudProvider::Aws => write!(f, "AWS"),
            CloudProvider::Azure => write!(f, "Azure"),
        }
    }
}

impl From<CloudProvider> for crate::config::CloudProviderKind {
    fn from(value: CloudProvider) -> Self {
        match value {
            CloudProvider::Aws => crate::config::CloudProviderKind::Aws,
            CloudProvider::Azure => crate::config::CloudProviderKind::Azure,
        }
    }
}
