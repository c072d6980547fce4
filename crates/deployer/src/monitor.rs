//! Background health monitoring.
//!
//! Polls the configured endpoint on a fixed interval until cancelled. Probe
//! failures are logged and never stop the loop.

use std::time::Duration;

use reqwest::StatusCode;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument, Span};

use crate::config::MonitoringConfig;
use crate::error::DeployError;

/// Result of a single probe.
#[derive(Debug)]
pub enum ProbeOutcome {
    /// HTTP 200 with a JSON body.
    Healthy(serde_json::Value),
    /// Any other HTTP status.
    Degraded(StatusCode),
    /// Transport failure or unreadable body.
    Failed(DeployError),
}

impl ProbeOutcome {
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy(_))
    }
}

/// Periodic HTTP health checker.
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    endpoint: String,
    interval: Duration,
    client: reqwest::Client,
}

impl HealthMonitor {
    /// Build a monitor from its configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &MonitoringConfig) -> Result<Self, DeployError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DeployError::UnexpectedFailure(format!("http client: {e}")))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            interval: config.interval(),
            client,
        })
    }

    /// Issue one request and log the outcome.
    pub async fn probe_once(&self) -> ProbeOutcome {
        let outcome = match self.client.get(&self.endpoint).send().await {
            Ok(response) if response.status() == StatusCode::OK => {
                match response.json::<serde_json::Value>().await {
                    Ok(body) => ProbeOutcome::Healthy(body),
                    Err(e) => ProbeOutcome::Failed(DeployError::HealthProbeFailure(format!(
                        "invalid body: {e}"
                    ))),
                }
            }
            Ok(response) => ProbeOutcome::Degraded(response.status()),
            Err(e) => ProbeOutcome::Failed(DeployError::HealthProbeFailure(e.to_string())),
        };

        match &outcome {
            ProbeOutcome::Healthy(body) => {
                info!(endpoint = %self.endpoint, body = %body, "Monitoring endpoint is healthy");
            }
            ProbeOutcome::Degraded(status) => {
                warn!(endpoint = %self.endpoint, status = status.as_u16(), "Monitoring endpoint returned non-OK status");
            }
            ProbeOutcome::Failed(e) => {
                error!(endpoint = %self.endpoint, error = %e, "Monitoring endpoint failed");
            }
        }

        outcome
    }

    /// Start polling in a background task owned by the returned handle.
    #[must_use]
    pub fn spawn(self, span: Span) -> MonitorHandle {
        let token = CancellationToken::new();
        let cancel = token.clone();

        let join = tokio::spawn(
            async move {
                info!(endpoint = %self.endpoint, interval_secs = self.interval.as_secs(), "Starting monitoring");
                loop {
                    self.probe_once().await;
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(self.interval) => {}
                    }
                }
                debug!(endpoint = %self.endpoint, "Monitoring stopped");
            }
            .instrument(span),
        );

        MonitorHandle { token, join }
    }
}

/// Owner of a running monitor task.
#[derive(Debug)]
pub struct MonitorHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl MonitorHandle {
    /// Token that stops the loop when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Cancel the loop and wait for the task to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.join.await {
            error!(error = %e, "Monitor task ended abnormally");
        }
    }
}
