//! IUDX Platform Deployer Library.
//!
//! Installs Rancher onto a Kubernetes cluster, deploys the declared IUDX
//! components in parallel, starts a background health monitor and reports
//! the final status.
//!
//! # Example
//!
//! ```ignore
//! use iudx_deployer::{DeploymentConfig, Deployer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = DeploymentConfig::from_file("deploy.yaml".as_ref())?;
//!     let mut deployer = Deployer::new(config);
//!     let ok = deployer.deploy().await;
//!     deployer.shutdown().await;
//!     std::process::exit(i32::from(!ok));
//! }
//! ```

// Allow product names without backticks in doc comments
#![allow(clippy::doc_markdown)]

pub mod cluster;
pub mod command;
pub mod components;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod platform;
pub mod probe;
pub mod stage;
pub mod status;
pub mod ui;

#[cfg(test)]
mod testing;

// Re-export commonly used types at the crate root
pub use cluster::ClusterClient;
pub use command::{CommandOutput, CommandRunner, ProcessRunner};
pub use components::{ComponentInstaller, ComponentResult};
pub use config::{ComponentKind, ComponentSpec, DeploymentConfig, NodeRequirements};
pub use coordinator::Deployer;
pub use error::{DeployError, ToolError};
pub use monitor::{HealthMonitor, MonitorHandle};
pub use stage::DeployStage;
pub use status::{strict_running_verdict, StatusMap};
