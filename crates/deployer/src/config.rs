//! Deployment configuration types.
//!
//! The configuration is a single YAML document loaded once at startup and
//! shared read-only by every stage of the deployment.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::DeployError;

/// Minimum host capacity required before anything is installed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeRequirements {
    /// Logical CPU cores.
    pub cpu_cores: usize,
    /// Total memory in GiB.
    pub memory_gb: f64,
    /// Free disk space on `/` in GiB.
    pub disk_gb: f64,
}

impl Default for NodeRequirements {
    fn default() -> Self {
        Self {
            cpu_cores: 4,
            memory_gb: 8.0,
            disk_gb: 50.0,
        }
    }
}

/// Cluster-management platform (Rancher by default).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Helm repository URL hosting the platform chart.
    #[serde(alias = "helm_repo")]
    pub repo_url: String,
    /// Local alias the repository is registered under.
    pub repo_alias: String,
    /// Chart name inside the repository.
    pub chart_name: String,
    /// Helm release name.
    pub release_name: String,
    /// Namespace the platform is installed into.
    pub namespace: String,
    /// Hostname the platform UI is served on.
    pub hostname: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            repo_url: "https://releases.rancher.com/server-charts/stable".into(),
            repo_alias: "rancher-stable".into(),
            chart_name: "rancher".into(),
            release_name: "rancher".into(),
            namespace: "cattle-system".into(),
            hostname: "rancher.local".into(),
        }
    }
}

impl PlatformConfig {
    /// Chart reference as understood by `helm install`.
    #[must_use]
    pub fn chart_ref(&self) -> String {
        format!("{}/{}", self.repo_alias, self.chart_name)
    }
}

/// How a component is installed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ComponentKind {
    /// `helm install` of a chart with key/value overrides.
    Helm {
        chart: String,
        #[serde(default)]
        values: BTreeMap<String, serde_yaml::Value>,
    },
    /// `kubectl apply -f` of a manifest file.
    Kubectl { manifest: String },
}

/// One deployable workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    /// Unique name; also the helm release name and the `app` pod label.
    pub name: String,
    /// Target namespace.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(flatten)]
    pub kind: ComponentKind,
}

fn default_namespace() -> String {
    "default".into()
}

impl ComponentSpec {
    /// Build a chart-based spec.
    #[must_use]
    pub fn helm(
        name: impl Into<String>,
        namespace: impl Into<String>,
        chart: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            kind: ComponentKind::Helm {
                chart: chart.into(),
                values: BTreeMap::new(),
            },
        }
    }

    /// Build a manifest-based spec.
    #[must_use]
    pub fn manifest(
        name: impl Into<String>,
        namespace: impl Into<String>,
        manifest: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            kind: ComponentKind::Kubectl {
                manifest: manifest.into(),
            },
        }
    }

    /// Add a helm value override. No-op for manifest-based specs.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<serde_yaml::Value>) -> Self {
        if let ComponentKind::Helm { values, .. } = &mut self.kind {
            values.insert(key.into(), value.into());
        }
        self
    }

    /// Flatten overrides into a single `--set` expression (`k1=v1,k2=v2`).
    ///
    /// Returns `None` for manifest-based specs and for charts without
    /// overrides.
    #[must_use]
    pub fn set_expression(&self) -> Option<String> {
        match &self.kind {
            ComponentKind::Helm { values, .. } if !values.is_empty() => Some(
                values
                    .iter()
                    .map(|(k, v)| format!("{k}={}", render_scalar(v)))
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            _ => None,
        }
    }
}

fn render_scalar(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::Null => String::new(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// Health endpoint polled by the background monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub endpoint: String,
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/status".into(),
            interval_secs: 60,
            timeout_secs: 5,
        }
    }
}

impl MonitoringConfig {
    /// Poll interval, never shorter than one second.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        if self.interval_secs == 0 {
            Duration::from_secs(1)
        } else {
            Duration::from_secs(self.interval_secs)
        }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// External tool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Control-plane CLI binary.
    pub kubectl: String,
    /// Package installer binary.
    pub helm: String,
    /// Upper bound for any single tool invocation.
    pub command_timeout_secs: u64,
    /// Pause after the platform install before taking the node snapshot.
    pub settle_secs: u64,
    /// Maximum simultaneous component installs.
    pub max_parallel_installs: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            kubectl: "kubectl".into(),
            helm: "helm".into(),
            command_timeout_secs: 900,
            settle_secs: 30,
            max_parallel_installs: 4,
        }
    }
}

impl ToolsConfig {
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    #[must_use]
    pub const fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

/// Full deployment document.
///
/// `platform`, `components` and `monitoring` are optional at parse time so
/// that [`DeploymentConfig::validate`] can report which one is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    #[serde(default)]
    pub node_requirements: NodeRequirements,
    #[serde(default, alias = "rancher", deserialize_with = "present_section")]
    pub platform: Option<PlatformConfig>,
    #[serde(default, deserialize_with = "present_section")]
    pub components: Option<Vec<ComponentSpec>>,
    #[serde(default, deserialize_with = "present_section")]
    pub monitoring: Option<MonitoringConfig>,
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// A section key that is present with an empty value counts as present and
/// takes its defaults. Only an absent key yields `None`.
fn present_section<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(|section| Some(section.unwrap_or_default()))
}

impl DeploymentConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Check that every required section is present and component names are
    /// unique.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::ConfigInvalid`] naming the first problem found.
    pub fn validate(&self) -> Result<(), DeployError> {
        info!("Validating configuration");
        let missing = [
            ("platform", self.platform.is_none()),
            ("components", self.components.is_none()),
            ("monitoring", self.monitoring.is_none()),
        ]
        .into_iter()
        .find_map(|(section, absent)| absent.then_some(section));

        if let Some(section) = missing {
            error!(section, "Missing configuration section");
            return Err(DeployError::ConfigInvalid(format!(
                "missing configuration section: {section}"
            )));
        }

        let mut seen = HashSet::new();
        for component in self.components() {
            if !seen.insert(component.name.as_str()) {
                error!(component = %component.name, "Duplicate component name");
                return Err(DeployError::ConfigInvalid(format!(
                    "duplicate component name: {}",
                    component.name
                )));
            }
        }

        info!("Configuration validated");
        Ok(())
    }

    /// Platform settings, falling back to defaults when the section is absent.
    #[must_use]
    pub fn platform(&self) -> PlatformConfig {
        self.platform.clone().unwrap_or_default()
    }

    /// Declared components in document order.
    #[must_use]
    pub fn components(&self) -> &[ComponentSpec] {
        self.components.as_deref().unwrap_or_default()
    }

    /// Monitoring settings, falling back to defaults when the section is absent.
    #[must_use]
    pub fn monitoring(&self) -> MonitoringConfig {
        self.monitoring.clone().unwrap_or_default()
    }
}
