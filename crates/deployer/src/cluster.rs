//! Typed wrappers around the `kubectl` and `helm` command lines.

use std::sync::Arc;

use tracing::debug;

use crate::command::CommandRunner;
use crate::config::ToolsConfig;
use crate::error::ToolError;

/// JSONPath selecting the `Ready` condition status of every node.
pub const NODE_READY_JSONPATH: &str =
    "jsonpath={.items[*].status.conditions[?(@.type=='Ready')].status}";

/// JSONPath selecting the phase of every matched pod.
pub const POD_PHASE_JSONPATH: &str = "jsonpath={.items[*].status.phase}";

/// Client for the cluster control plane and package installer.
///
/// Cheap to clone; all clones share the same runner.
#[derive(Clone)]
pub struct ClusterClient {
    runner: Arc<dyn CommandRunner>,
    kubectl: String,
    helm: String,
}

impl ClusterClient {
    /// Create a client using the default tool names.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self::with_tools(runner, &ToolsConfig::default())
    }

    /// Create a client using the binaries named in `tools`.
    #[must_use]
    pub fn with_tools(runner: Arc<dyn CommandRunner>, tools: &ToolsConfig) -> Self {
        Self {
            runner,
            kubectl: tools.kubectl.clone(),
            helm: tools.helm.clone(),
        }
    }

    /// Run `kubectl` and return its stdout.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if kubectl fails, cannot start, or times out.
    pub async fn kubectl(&self, args: &[&str]) -> Result<String, ToolError> {
        self.exec(&self.kubectl, args).await
    }

    /// Run `helm` and return its stdout.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if helm fails, cannot start, or times out.
    pub async fn helm(&self, args: &[&str]) -> Result<String, ToolError> {
        self.exec(&self.helm, args).await
    }

    async fn exec(&self, program: &str, args: &[&str]) -> Result<String, ToolError> {
        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        let output = self.runner.run(program, &args).await?;
        debug!(program, bytes = output.stdout.len(), "Command succeeded");
        Ok(output.stdout)
    }

    /// `kubectl get nodes`, used as a lightweight connectivity probe.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if the control plane is unreachable.
    pub async fn get_nodes(&self) -> Result<String, ToolError> {
        self.kubectl(&["get", "nodes"]).await
    }

    /// `kubectl get nodes -o wide`.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if the query fails.
    pub async fn get_nodes_wide(&self) -> Result<String, ToolError> {
        self.kubectl(&["get", "nodes", "-o", "wide"]).await
    }

    /// Space-separated `Ready` condition status of every node.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if the query fails.
    pub async fn node_ready_conditions(&self) -> Result<String, ToolError> {
        self.kubectl(&["get", "nodes", "-o", NODE_READY_JSONPATH])
            .await
    }

    /// Space-separated phases of pods labelled `app=<app>` in `namespace`.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if the query fails.
    pub async fn pod_phases(&self, namespace: &str, app: &str) -> Result<String, ToolError> {
        let selector = format!("app={app}");
        self.kubectl(&[
            "get",
            "pods",
            "-n",
            namespace,
            "-l",
            selector.as_str(),
            "-o",
            POD_PHASE_JSONPATH,
        ])
        .await
    }

    /// `kubectl apply -f <manifest>`.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if the apply fails.
    pub async fn apply_manifest(&self, manifest: &str) -> Result<String, ToolError> {
        self.kubectl(&["apply", "-f", manifest]).await
    }

    /// `helm repo add <alias> <url>`.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if helm rejects the repository.
    pub async fn helm_repo_add(&self, alias: &str, url: &str) -> Result<String, ToolError> {
        self.helm(&["repo", "add", alias, url]).await
    }

    /// `helm repo update`.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if the refresh fails.
    pub async fn helm_repo_update(&self) -> Result<String, ToolError> {
        self.helm(&["repo", "update"]).await
    }

    /// `helm install` into `namespace`, creating it if needed, and block until
    /// helm reports the release ready.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if the install fails.
    pub async fn helm_install(
        &self,
        release: &str,
        chart: &str,
        namespace: &str,
        set: Option<&str>,
    ) -> Result<String, ToolError> {
        let mut args = vec![
            "install",
            release,
            chart,
            "--namespace",
            namespace,
            "--create-namespace",
        ];
        if let Some(set) = set {
            args.extend(["--set", set]);
        }
        args.push("--wait");
        self.helm(&args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRunner;

    #[tokio::test]
    async fn test_helm_install_argument_vector() {
        let runner = Arc::new(FakeRunner::new());
        let client = ClusterClient::new(runner.clone());

        client
            .helm_install("rancher", "rancher-stable/rancher", "cattle-system", Some("hostname=r.local"))
            .await
            .unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                "helm install rancher rancher-stable/rancher --namespace cattle-system \
                 --create-namespace --set hostname=r.local --wait"
            ]
        );
    }

    #[tokio::test]
    async fn test_helm_install_without_overrides_omits_set() {
        let runner = Arc::new(FakeRunner::new());
        let client = ClusterClient::new(runner.clone());

        client
            .helm_install("pg", "bitnami/postgresql", "db", None)
            .await
            .unwrap();

        assert_eq!(
            runner.calls(),
            vec!["helm install pg bitnami/postgresql --namespace db --create-namespace --wait"]
        );
    }

    #[tokio::test]
    async fn test_custom_tool_names() {
        let runner = Arc::new(FakeRunner::new());
        let tools = ToolsConfig {
            kubectl: "/opt/bin/kubectl".into(),
            ..ToolsConfig::default()
        };
        let client = ClusterClient::with_tools(runner.clone(), &tools);

        client.pod_phases("iudx", "catalogue").await.unwrap();

        assert_eq!(
            runner.calls(),
            vec![format!(
                "/opt/bin/kubectl get pods -n iudx -l app=catalogue -o {POD_PHASE_JSONPATH}"
            )]
        );
    }

    #[tokio::test]
    async fn test_failure_is_propagated() {
        let runner = Arc::new(FakeRunner::new().fail("kubectl apply", 1, "not found"));
        let client = ClusterClient::new(runner);

        let err = client.apply_manifest("b.yaml").await.unwrap_err();
        assert_eq!(err.diagnostic(), "not found");
    }
}
