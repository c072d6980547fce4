//! Error types for the deployment orchestrator.

use std::time::Duration;

use thiserror::Error;

/// Failures raised by a single external tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool ran and exited non-zero.
    #[error("{program} exited with {}: {stderr}", exit_label(.code))]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The tool could not be started at all.
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool did not finish within its allotted time.
    #[error("{program} timed out after {}s", .after.as_secs())]
    Timeout { program: String, after: Duration },
}

impl ToolError {
    /// Diagnostic text to surface in reports.
    ///
    /// For a tool that reported failure this is the captured stderr; for
    /// everything else it is the error's display text.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Failed { stderr, .. } => stderr.trim().to_string(),
            other => other.to_string(),
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| format!("status {c}"))
}

/// Deployment-level failure taxonomy.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Host capacity is below the declared minimums.
    #[error("node does not meet requirements: {}", .deficits.join(", "))]
    ResourceInsufficient { deficits: Vec<String> },

    /// The cluster control plane could not be reached.
    #[error("cluster connectivity check failed: {0}")]
    ConnectivityFailure(String),

    /// A required configuration section is absent or malformed.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// An external tool executed and reported failure.
    #[error("{program} failed: {diagnostic}")]
    ToolInvocationFailure { program: String, diagnostic: String },

    /// An external tool exceeded its timeout.
    #[error("{program} timed out after {}s", .after.as_secs())]
    Timeout { program: String, after: Duration },

    /// Anything else, including tools that could not be started.
    #[error("unexpected failure: {0}")]
    UnexpectedFailure(String),

    /// The health endpoint was unreachable or unhealthy.
    #[error("health probe failed: {0}")]
    HealthProbeFailure(String),
}

impl From<ToolError> for DeployError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Failed {
                program, stderr, ..
            } => Self::ToolInvocationFailure {
                program,
                diagnostic: stderr.trim().to_string(),
            },
            ToolError::Timeout { program, after } => Self::Timeout { program, after },
            spawn @ ToolError::Spawn { .. } => Self::UnexpectedFailure(spawn.to_string()),
        }
    }
}

pub type Result<T, E = DeployError> = std::result::Result<T, E>;
