//! Base platform installation (Rancher on Kubernetes).

use std::time::Duration;

use tracing::{error, info, warn};

use crate::cluster::ClusterClient;
use crate::config::PlatformConfig;
use crate::error::Result;

/// Installs the cluster-management platform.
///
/// Steps run strictly in order and stop at the first failure. Nothing that
/// already succeeded is rolled back.
pub struct PlatformInstaller {
    client: ClusterClient,
    settle: Duration,
}

impl PlatformInstaller {
    #[must_use]
    pub const fn new(client: ClusterClient, settle: Duration) -> Self {
        Self { client, settle }
    }

    /// Boolean wrapper around [`Self::install`].
    pub async fn install_platform(&self, platform: &PlatformConfig) -> bool {
        match self.install(platform).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Failed to deploy platform");
                false
            }
        }
    }

    /// Register the chart repository, install the platform release, wait for
    /// the control plane to settle and log a node snapshot.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error.
    pub async fn install(&self, platform: &PlatformConfig) -> Result<()> {
        info!(
            release = %platform.release_name,
            namespace = %platform.namespace,
            "Deploying platform"
        );

        self.client
            .helm_repo_add(&platform.repo_alias, &platform.repo_url)
            .await?;
        self.client.helm_repo_update().await?;

        let hostname = format!("hostname={}", platform.hostname);
        self.client
            .helm_install(
                &platform.release_name,
                &platform.chart_ref(),
                &platform.namespace,
                Some(&hostname),
            )
            .await?;
        info!(namespace = %platform.namespace, "Platform deployed");

        if !self.settle.is_zero() {
            info!(secs = self.settle.as_secs(), "Waiting for control plane to settle");
            tokio::time::sleep(self.settle).await;
        }

        match self.client.get_nodes_wide().await {
            Ok(nodes) => info!("Kubernetes nodes:\n{}", nodes.trim_end()),
            Err(e) => warn!(error = %e, "Could not list nodes after platform install"),
        }

        Ok(())
    }
}
