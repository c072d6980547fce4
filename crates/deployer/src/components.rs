//! Workload component installation.
//!
//! Each component is installed in isolation: whatever happens to one install
//! is folded into its [`ComponentResult`] and never affects the others.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{error, info, info_span, Instrument, Span};

use crate::cluster::ClusterClient;
use crate::config::{ComponentKind, ComponentSpec};
use crate::error::ToolError;

/// Outcome of one component install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentResult {
    pub name: String,
    pub success: bool,
    pub message: String,
}

impl ComponentResult {
    fn deployed(name: &str) -> Self {
        Self {
            name: name.to_string(),
            success: true,
            message: format!("{name} deployed"),
        }
    }

    fn failed(name: &str, diagnostic: &str) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            message: format!("{name} deployment failed: {diagnostic}"),
        }
    }
}

/// Installs chart- and manifest-based components.
pub struct ComponentInstaller {
    client: ClusterClient,
    max_parallel: usize,
    span: Span,
}

impl ComponentInstaller {
    #[must_use]
    pub fn new(client: ClusterClient, max_parallel: usize) -> Self {
        Self {
            client,
            max_parallel: max_parallel.max(1),
            span: Span::none(),
        }
    }

    /// Attach every install to `span`.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Install a single component. Never fails; failures become results.
    pub async fn install_component(&self, spec: &ComponentSpec) -> ComponentResult {
        info!(component = %spec.name, namespace = %spec.namespace, "Deploying component");

        match self.apply(spec).await {
            Ok(()) => {
                info!(component = %spec.name, "Component deployed");
                ComponentResult::deployed(&spec.name)
            }
            Err(e @ ToolError::Failed { .. }) => {
                error!(component = %spec.name, stderr = %e.diagnostic(), "Failed to deploy component");
                ComponentResult::failed(&spec.name, &e.diagnostic())
            }
            Err(e) => {
                error!(component = %spec.name, error = %e, "Unexpected error deploying component");
                ComponentResult::failed(&spec.name, &e.to_string())
            }
        }
    }

    async fn apply(&self, spec: &ComponentSpec) -> Result<(), ToolError> {
        match &spec.kind {
            ComponentKind::Helm { chart, .. } => {
                let set = spec.set_expression();
                self.client
                    .helm_install(&spec.name, chart, &spec.namespace, set.as_deref())
                    .await?;
            }
            ComponentKind::Kubectl { manifest } => {
                self.client.apply_manifest(manifest).await?;
            }
        }
        Ok(())
    }

    /// Install every component with bounded concurrency.
    ///
    /// Returns exactly one result per component, in completion order.
    pub async fn install_all(&self, specs: &[ComponentSpec]) -> Vec<ComponentResult> {
        info!(
            count = specs.len(),
            max_parallel = self.max_parallel,
            "Deploying all components"
        );

        stream::iter(specs)
            .map(|spec| {
                let span = info_span!(parent: &self.span, "component", name = %spec.name);
                self.install_component(spec).instrument(span)
            })
            .buffer_unordered(self.max_parallel)
            .collect::<Vec<_>>()
            .await
    }
}
