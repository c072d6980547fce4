//! Live status queries for the platform and every component.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::cluster::ClusterClient;
use crate::config::ComponentSpec;

/// Synthetic status key for the platform itself.
pub const PLATFORM_STATUS_KEY: &str = "platform";

/// Platform status when every node reports `Ready=True`.
pub const PLATFORM_READY: &str = "Ready";
/// Platform status otherwise.
pub const PLATFORM_NOT_READY: &str = "NotReady";
/// Component status when no pod phase could be read.
pub const STATUS_UNKNOWN: &str = "Unknown";
/// The only component status accepted by [`strict_running_verdict`].
pub const STATUS_RUNNING: &str = "Running";

/// Component name (plus [`PLATFORM_STATUS_KEY`]) to status string.
pub type StatusMap = BTreeMap<String, String>;

/// Final deployment verdict.
///
/// The map must be non-empty and every value must be exactly `Running`.
/// The platform entry uses the `Ready`/`NotReady` vocabulary, so whenever it
/// is present this verdict is `false` even if the platform is healthy.
/// Multi-pod components report space-separated phases (`Running Running`)
/// and fail the verdict as well.
#[must_use]
pub fn strict_running_verdict(status: &StatusMap) -> bool {
    !status.is_empty() && status.values().all(|s| s == STATUS_RUNNING)
}

/// Point-in-time status snapshots; nothing is cached between calls.
pub struct StatusReporter {
    client: ClusterClient,
}

impl StatusReporter {
    #[must_use]
    pub const fn new(client: ClusterClient) -> Self {
        Self { client }
    }

    /// Query platform readiness and the pod phase of every component.
    pub async fn get_status(&self, components: &[ComponentSpec]) -> StatusMap {
        info!("Checking component statuses");
        let mut status = StatusMap::new();

        let platform = match self.client.node_ready_conditions().await {
            Ok(conditions) if conditions.contains("True") => PLATFORM_READY,
            Ok(_) => PLATFORM_NOT_READY,
            Err(e) => {
                warn!(error = %e, "Node readiness query failed");
                PLATFORM_NOT_READY
            }
        };
        status.insert(PLATFORM_STATUS_KEY.to_string(), platform.to_string());

        for component in components {
            let phase = match self
                .client
                .pod_phases(&component.namespace, &component.name)
                .await
            {
                Ok(phases) if !phases.trim().is_empty() => phases.trim().to_string(),
                Ok(_) => STATUS_UNKNOWN.to_string(),
                Err(e) => {
                    warn!(component = %component.name, error = %e, "Pod phase query failed");
                    STATUS_UNKNOWN.to_string()
                }
            };
            status.insert(component.name.clone(), phase);
        }

        info!(status = ?status, "Component statuses");
        status
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::FakeRunner;

    fn map(entries: &[(&str, &str)]) -> StatusMap {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn specs() -> Vec<ComponentSpec> {
        vec![
            ComponentSpec::helm("immudb", "immudb", "codenotary/immudb"),
            ComponentSpec::manifest("catalogue", "iudx", "catalogue.yaml"),
        ]
    }

    #[test]
    fn test_verdict_rejects_platform_ready() {
        assert!(!strict_running_verdict(&map(&[
            ("platform", "Ready"),
            ("svcA", "Running"),
        ])));
    }

    #[test]
    fn test_verdict_accepts_all_running() {
        assert!(strict_running_verdict(&map(&[("a", "Running"), ("b", "Running")])));
    }

    #[test]
    fn test_verdict_rejects_empty_and_blank() {
        assert!(!strict_running_verdict(&StatusMap::new()));
        assert!(!strict_running_verdict(&map(&[("a", "Running"), ("b", "")])));
        assert!(!strict_running_verdict(&map(&[("a", "Running Running")])));
    }

    #[tokio::test]
    async fn test_status_maps_platform_and_phases() {
        let runner = Arc::new(
            FakeRunner::new()
                .respond("kubectl get nodes", "True True")
                .respond("kubectl get pods -n immudb", "Running")
                .respond("kubectl get pods -n iudx", ""),
        );
        let reporter = StatusReporter::new(ClusterClient::new(runner.clone()));

        let status = reporter.get_status(&specs()).await;

        assert_eq!(
            status,
            map(&[
                ("platform", "Ready"),
                ("immudb", "Running"),
                ("catalogue", "Unknown"),
            ])
        );
        assert_eq!(runner.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_queries_degrade() {
        let runner = Arc::new(
            FakeRunner::new()
                .fail("kubectl get nodes", 1, "unreachable")
                .fail("kubectl get pods", 1, "unreachable"),
        );
        let reporter = StatusReporter::new(ClusterClient::new(runner));

        let status = reporter.get_status(&specs()).await;

        assert_eq!(status["platform"], "NotReady");
        assert_eq!(status["immudb"], "Unknown");
        assert_eq!(status["catalogue"], "Unknown");
    }

    #[tokio::test]
    async fn test_repeated_queries_are_identical() {
        let runner = Arc::new(
            FakeRunner::new()
                .respond("kubectl get nodes", "False")
                .respond("kubectl get pods", "Pending"),
        );
        let reporter = StatusReporter::new(ClusterClient::new(runner.clone()));

        let first = reporter.get_status(&specs()).await;
        let second = reporter.get_status(&specs()).await;

        assert_eq!(first, second);
        assert_eq!(first["platform"], "NotReady");
        assert_eq!(runner.calls().len(), 6);
    }
}
