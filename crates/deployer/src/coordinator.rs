//! Deployment coordination.
//!
//! Drives the full workflow:
//! - Node readiness gate (host capacity + cluster connectivity)
//! - Configuration validation
//! - Platform install
//! - Parallel component installs
//! - Background health monitoring
//! - Final status snapshot and verdict

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::cluster::ClusterClient;
use crate::command::{CommandRunner, ProcessRunner};
use crate::components::{ComponentInstaller, ComponentResult};
use crate::config::DeploymentConfig;
use crate::error::Result;
use crate::monitor::{HealthMonitor, MonitorHandle};
use crate::platform::PlatformInstaller;
use crate::probe::{HostInspector, ResourceProber, SysinfoInspector};
use crate::stage::DeployStage;
use crate::status::{strict_running_verdict, StatusMap, StatusReporter};

/// Runs one deployment attempt from readiness gate to final verdict.
///
/// Nothing is retried and nothing is rolled back: a failed gate leaves any
/// already-installed releases on the cluster.
pub struct Deployer {
    config: Arc<DeploymentConfig>,
    client: ClusterClient,
    inspector: Arc<dyn HostInspector>,
    stage: DeployStage,
    results: Vec<ComponentResult>,
    status: Option<StatusMap>,
    monitor: Option<MonitorHandle>,
    span: Span,
}

impl Deployer {
    /// Deployer that runs real `kubectl`/`helm` processes.
    #[must_use]
    pub fn new(config: DeploymentConfig) -> Self {
        let runner = Arc::new(ProcessRunner::new(config.tools.command_timeout()));
        Self::with_runner(config, runner)
    }

    /// Deployer that executes tools through `runner`.
    #[must_use]
    pub fn with_runner(config: DeploymentConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let client = ClusterClient::with_tools(runner, &config.tools);
        let span = info_span!("deployment", run_id = %Uuid::new_v4());
        Self {
            config: Arc::new(config),
            client,
            inspector: Arc::new(SysinfoInspector),
            stage: DeployStage::Init,
            results: Vec::new(),
            status: None,
            monitor: None,
            span,
        }
    }

    /// Replace the host capacity source.
    #[must_use]
    pub fn with_inspector(mut self, inspector: Arc<dyn HostInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    #[must_use]
    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    #[must_use]
    pub const fn stage(&self) -> DeployStage {
        self.stage
    }

    /// Component results from the last fan-out, in completion order.
    #[must_use]
    pub fn results(&self) -> &[ComponentResult] {
        &self.results
    }

    /// Status snapshot from the last report.
    #[must_use]
    pub const fn status(&self) -> Option<&StatusMap> {
        self.status.as_ref()
    }

    /// Take ownership of the running monitor, if any.
    pub fn take_monitor(&mut self) -> Option<MonitorHandle> {
        self.monitor.take()
    }

    /// Stop the monitor if one is running.
    pub async fn shutdown(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.shutdown().await;
        }
    }

    /// Host capacity and connectivity gate.
    pub async fn check_readiness(&self) -> bool {
        ResourceProber::with_inspector(self.client.clone(), Arc::clone(&self.inspector))
            .check_readiness(&self.config.node_requirements)
            .await
    }

    /// Required-sections gate.
    #[must_use]
    pub fn validate_config(&self) -> bool {
        self.config.validate().is_ok()
    }

    /// Platform install gate.
    pub async fn deploy_platform(&self) -> bool {
        PlatformInstaller::new(self.client.clone(), self.config.tools.settle())
            .install_platform(&self.config.platform())
            .await
    }

    /// Install every declared component concurrently and record the results.
    pub async fn deploy_components(&mut self) -> &[ComponentResult] {
        let installer =
            ComponentInstaller::new(self.client.clone(), self.config.tools.max_parallel_installs)
                .with_span(self.span.clone());
        self.results = installer.install_all(self.config.components()).await;
        &self.results
    }

    /// Spawn the health monitor. A monitor that is already running is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the monitor's HTTP client cannot be built.
    pub fn start_monitoring(&mut self) -> Result<()> {
        if self.monitor.is_some() {
            warn!("Monitoring already running");
            return Ok(());
        }
        let monitor = HealthMonitor::new(&self.config.monitoring())?;
        let span = info_span!(parent: &self.span, "monitor");
        self.monitor = Some(monitor.spawn(span));
        Ok(())
    }

    /// Take a fresh status snapshot.
    pub async fn get_status(&mut self) -> StatusMap {
        let status = StatusReporter::new(self.client.clone())
            .get_status(self.config.components())
            .await;
        self.status = Some(status.clone());
        status
    }

    /// Run the whole workflow and return the final verdict.
    pub async fn deploy(&mut self) -> bool {
        let span = self.span.clone();
        self.run().instrument(span).await
    }

    async fn run(&mut self) -> bool {
        let started = Instant::now();
        info!("Starting deployment");

        if !self.check_readiness().await {
            return self.halt("Node readiness check failed");
        }
        self.advance();

        if !self.validate_config() {
            return self.halt("Configuration validation failed");
        }
        self.advance();

        if !self.deploy_platform().await {
            return self.halt("Platform deployment failed");
        }
        self.advance();

        let failed: Vec<String> = self
            .deploy_components()
            .await
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.message.clone())
            .collect();
        if !failed.is_empty() {
            for message in &failed {
                error!(message = %message, "Component deployment failed");
            }
            return self.halt("Component deployment failed");
        }
        self.advance();

        if let Err(e) = self.start_monitoring() {
            error!(error = %e, "Could not start monitoring");
            return self.halt("Monitoring startup failed");
        }
        self.advance();

        let status = self.get_status().await;
        self.advance();

        let verdict = strict_running_verdict(&status);
        self.advance();
        info!(
            status = ?status,
            success = verdict,
            elapsed_secs = started.elapsed().as_secs(),
            "Final deployment status"
        );
        verdict
    }

    fn advance(&mut self) {
        let next = self.stage.next();
        info!(
            step = next.step_number(),
            total = DeployStage::TOTAL_STEPS,
            "Stage: {} -> {}",
            self.stage,
            next
        );
        self.stage = next;
    }

    fn halt(&mut self, reason: &str) -> bool {
        self.stage = self.stage.abort();
        error!(stage = %self.stage, "{reason}. Aborting deployment.");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ComponentSpec, MonitoringConfig, PlatformConfig, ToolsConfig};
    use crate::probe::HostResources;
    use crate::stage::DeployStageKind;
    use crate::testing::FakeRunner;

    struct Ample;

    impl HostInspector for Ample {
        fn inspect(&self) -> HostResources {
            HostResources {
                cpu_cores: 16,
                memory_gb: 64.0,
                disk_gb: 500.0,
            }
        }
    }

    fn config(components: Vec<ComponentSpec>) -> DeploymentConfig {
        DeploymentConfig {
            platform: Some(PlatformConfig::default()),
            components: Some(components),
            monitoring: Some(MonitoringConfig {
                endpoint: "http://127.0.0.1:9/status".into(),
                interval_secs: 3600,
                timeout_secs: 1,
            }),
            tools: ToolsConfig {
                settle_secs: 0,
                ..ToolsConfig::default()
            },
            ..DeploymentConfig::default()
        }
    }

    fn deployer(config: DeploymentConfig, runner: &Arc<FakeRunner>) -> Deployer {
        Deployer::with_runner(config, runner.clone()).with_inspector(Arc::new(Ample))
    }

    fn two_components() -> Vec<ComponentSpec> {
        vec![
            ComponentSpec::helm("A", "default", "repo/a"),
            ComponentSpec::manifest("B", "default", "b.yaml"),
        ]
    }

    #[tokio::test]
    async fn test_missing_monitoring_aborts_before_install() {
        let runner = Arc::new(FakeRunner::new());
        let mut cfg = config(two_components());
        cfg.monitoring = None;
        let mut deployer = deployer(cfg, &runner);

        assert!(!deployer.validate_config());
        assert!(!deployer.deploy().await);
        assert_eq!(
            deployer.stage(),
            DeployStage::Aborted {
                at: DeployStageKind::ConfigValidated
            }
        );
        assert!(runner.calls_starting_with("helm").is_empty());
        assert!(runner.calls_starting_with("kubectl apply").is_empty());
    }

    #[tokio::test]
    async fn test_repo_add_failure_skips_components() {
        let runner = Arc::new(FakeRunner::new().fail("helm repo add", 1, "network unreachable"));
        let mut deployer = deployer(config(two_components()), &runner);

        assert!(!deployer.deploy().await);
        assert_eq!(
            deployer.stage(),
            DeployStage::Aborted {
                at: DeployStageKind::PlatformDeployed
            }
        );
        assert!(deployer.results().is_empty());
        assert_eq!(runner.calls_starting_with("helm").len(), 1);
        assert!(runner.calls_starting_with("kubectl apply").is_empty());
    }

    #[tokio::test]
    async fn test_one_failed_component_fails_deploy() {
        let runner = Arc::new(FakeRunner::new().fail("kubectl apply -f b.yaml", 1, "not found"));
        let mut deployer = deployer(config(two_components()), &runner);

        assert!(!deployer.deploy().await);

        let mut results = deployer.results().to_vec();
        results.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            results,
            vec![
                ComponentResult {
                    name: "A".into(),
                    success: true,
                    message: "A deployed".into(),
                },
                ComponentResult {
                    name: "B".into(),
                    success: false,
                    message: "B deployment failed: not found".into(),
                },
            ]
        );
        assert_eq!(
            deployer.stage(),
            DeployStage::Aborted {
                at: DeployStageKind::ComponentsDeployed
            }
        );
        assert!(deployer.take_monitor().is_none());
    }

    #[tokio::test]
    async fn test_platform_ready_makes_verdict_false() {
        let runner = Arc::new(
            FakeRunner::new()
                .respond("kubectl get nodes -o jsonpath", "True")
                .respond("kubectl get pods", "Running"),
        );
        let mut deployer = deployer(config(two_components()), &runner);

        assert!(!deployer.deploy().await);
        assert_eq!(deployer.stage(), DeployStage::Done);

        let status = deployer.status().unwrap();
        assert_eq!(status["platform"], "Ready");
        assert_eq!(status["A"], "Running");
        assert_eq!(status["B"], "Running");

        let monitor = deployer.take_monitor().unwrap();
        assert!(!monitor.is_finished());
        monitor.shutdown().await;
    }

    #[tokio::test]
    async fn test_full_sequence_order() {
        let runner = Arc::new(FakeRunner::new());
        let mut deployer = deployer(config(vec![ComponentSpec::manifest("B", "iudx", "b.yaml")]), &runner);

        deployer.deploy().await;
        deployer.shutdown().await;

        let calls = runner.calls();
        assert_eq!(calls[0], "kubectl get nodes");
        assert!(calls[1].starts_with("helm repo add"));
        assert_eq!(calls[2], "helm repo update");
        assert!(calls[3].starts_with("helm install rancher"));
        assert_eq!(calls[4], "kubectl get nodes -o wide");
        assert_eq!(calls[5], "kubectl apply -f b.yaml");
        assert!(calls[6].starts_with("kubectl get nodes -o jsonpath"));
        assert!(calls[7].starts_with("kubectl get pods -n iudx -l app=B"));
        assert_eq!(calls.len(), 8);
    }

    #[tokio::test]
    async fn test_readiness_failure_aborts_at_readiness() {
        let runner = Arc::new(FakeRunner::new().fail("kubectl get nodes", 1, "refused"));
        let mut deployer = deployer(config(two_components()), &runner);

        assert!(!deployer.deploy().await);
        assert_eq!(
            deployer.stage(),
            DeployStage::Aborted {
                at: DeployStageKind::ReadinessChecked
            }
        );
        assert_eq!(runner.calls(), vec!["kubectl get nodes"]);
    }
}
