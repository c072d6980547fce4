//! Host readiness checks.
//!
//! Verifies that the local node has enough CPU, memory and disk for the
//! platform, and that the cluster control plane answers.

use std::path::Path;
use std::sync::Arc;

use sysinfo::{Disks, System};
use tracing::{error, info};

use crate::cluster::ClusterClient;
use crate::config::NodeRequirements;
use crate::error::{DeployError, Result};

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Point-in-time snapshot of host capacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostResources {
    pub cpu_cores: usize,
    pub memory_gb: f64,
    pub disk_gb: f64,
}

impl HostResources {
    /// Describe every metric that falls short of `requirements`.
    #[must_use]
    pub fn deficits(&self, requirements: &NodeRequirements) -> Vec<String> {
        let mut deficits = Vec::new();
        if self.cpu_cores < requirements.cpu_cores {
            deficits.push(format!("CPU {}/{}", self.cpu_cores, requirements.cpu_cores));
        }
        if self.memory_gb < requirements.memory_gb {
            deficits.push(format!(
                "Memory {:.2}/{:.2} GB",
                self.memory_gb, requirements.memory_gb
            ));
        }
        if self.disk_gb < requirements.disk_gb {
            deficits.push(format!(
                "Disk {:.2}/{:.2} GB",
                self.disk_gb, requirements.disk_gb
            ));
        }
        deficits
    }
}

/// Source of host capacity readings.
///
/// Readings may block; [`ResourceProber`] calls them off the async runtime.
pub trait HostInspector: Send + Sync {
    fn inspect(&self) -> HostResources;
}

/// Reads the live host through `sysinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoInspector;

impl HostInspector for SysinfoInspector {
    #[allow(clippy::cast_precision_loss)]
    fn inspect(&self) -> HostResources {
        let sys = System::new_all();

        let disks = Disks::new_with_refreshed_list();
        let root_free = disks
            .list()
            .iter()
            .find(|d| d.mount_point() == Path::new("/"))
            .map_or(0, sysinfo::Disk::available_space);

        HostResources {
            cpu_cores: sys.cpus().len(),
            memory_gb: sys.total_memory() as f64 / BYTES_PER_GIB,
            disk_gb: root_free as f64 / BYTES_PER_GIB,
        }
    }
}

/// Readiness gate run before anything is installed.
pub struct ResourceProber {
    client: ClusterClient,
    inspector: Arc<dyn HostInspector>,
}

impl ResourceProber {
    #[must_use]
    pub fn new(client: ClusterClient) -> Self {
        Self::with_inspector(client, Arc::new(SysinfoInspector))
    }

    #[must_use]
    pub fn with_inspector(client: ClusterClient, inspector: Arc<dyn HostInspector>) -> Self {
        Self { client, inspector }
    }

    /// Boolean readiness gate.
    pub async fn check_readiness(&self, requirements: &NodeRequirements) -> bool {
        self.verify(requirements).await.is_ok()
    }

    /// Check host capacity, then control-plane connectivity.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::ResourceInsufficient`] listing every short
    /// metric, or [`DeployError::ConnectivityFailure`] if `kubectl get nodes`
    /// fails.
    pub async fn verify(&self, requirements: &NodeRequirements) -> Result<HostResources> {
        info!("Checking node readiness");
        let inspector = Arc::clone(&self.inspector);
        let host = tokio::task::spawn_blocking(move || inspector.inspect())
            .await
            .map_err(|e| DeployError::UnexpectedFailure(format!("host inspection: {e}")))?;

        let deficits = host.deficits(requirements);
        if !deficits.is_empty() {
            for deficit in &deficits {
                error!(deficit = %deficit, "Node below minimum requirement");
            }
            return Err(DeployError::ResourceInsufficient { deficits });
        }
        info!(
            cpu_cores = host.cpu_cores,
            memory_gb = host.memory_gb,
            disk_gb = host.disk_gb,
            "Node meets requirements"
        );

        if let Err(e) = self.client.get_nodes().await {
            error!(error = %e, "kubectl failed to connect to cluster");
            return Err(DeployError::ConnectivityFailure(e.diagnostic()));
        }
        info!("kubectl connected to cluster");

        Ok(host)
    }
}
