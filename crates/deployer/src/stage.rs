//! Deployment stage machine.

use serde::{Deserialize, Serialize};

/// Stages of a deployment run, in order.
///
/// Every transition requires the previous stage's gate to pass. A failed gate
/// moves the run to [`DeployStage::Aborted`], which records the stage whose
/// gate failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStage {
    /// Nothing has run yet.
    Init,
    /// Host capacity and cluster connectivity verified.
    ReadinessChecked,
    /// Required configuration sections present.
    ConfigValidated,
    /// Platform chart installed.
    PlatformDeployed,
    /// Every component installed successfully.
    ComponentsDeployed,
    /// Health monitor running.
    MonitoringStarted,
    /// Status snapshot taken.
    StatusReported,
    /// Run finished.
    Done,
    /// Run halted while attempting `at`.
    Aborted { at: DeployStageKind },
}

/// Non-terminal stage identifiers, used to record where a run aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStageKind {
    Init,
    ReadinessChecked,
    ConfigValidated,
    PlatformDeployed,
    ComponentsDeployed,
    MonitoringStarted,
    StatusReported,
}

impl DeployStage {
    /// Total number of forward stages after `Init`.
    pub const TOTAL_STEPS: u8 = 7;

    /// Next stage in the sequence. Terminal stages map to themselves.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Init => Self::ReadinessChecked,
            Self::ReadinessChecked => Self::ConfigValidated,
            Self::ConfigValidated => Self::PlatformDeployed,
            Self::PlatformDeployed => Self::ComponentsDeployed,
            Self::ComponentsDeployed => Self::MonitoringStarted,
            Self::MonitoringStarted => Self::StatusReported,
            Self::StatusReported | Self::Done => Self::Done,
            aborted @ Self::Aborted { .. } => aborted,
        }
    }

    /// Abort while attempting the stage after this one. Terminal stages are
    /// unchanged.
    #[must_use]
    pub const fn abort(self) -> Self {
        match (self.next().kind(), self.kind()) {
            (Some(at), _) | (None, Some(at)) => Self::Aborted { at },
            (None, None) => self,
        }
    }

    #[must_use]
    pub const fn kind(self) -> Option<DeployStageKind> {
        match self {
            Self::Init => Some(DeployStageKind::Init),
            Self::ReadinessChecked => Some(DeployStageKind::ReadinessChecked),
            Self::ConfigValidated => Some(DeployStageKind::ConfigValidated),
            Self::PlatformDeployed => Some(DeployStageKind::PlatformDeployed),
            Self::ComponentsDeployed => Some(DeployStageKind::ComponentsDeployed),
            Self::MonitoringStarted => Some(DeployStageKind::MonitoringStarted),
            Self::StatusReported => Some(DeployStageKind::StatusReported),
            Self::Done | Self::Aborted { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted { .. })
    }

    /// Human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Init => "Not started",
            Self::ReadinessChecked => "Node readiness checked",
            Self::ConfigValidated => "Configuration validated",
            Self::PlatformDeployed => "Platform deployed",
            Self::ComponentsDeployed => "Components deployed",
            Self::MonitoringStarted => "Monitoring started",
            Self::StatusReported => "Status reported",
            Self::Done => "Done",
            Self::Aborted { .. } => "Aborted",
        }
    }

    /// Step number for progress display.
    #[must_use]
    pub const fn step_number(self) -> u8 {
        match self {
            Self::Init => 0,
            Self::ReadinessChecked => 1,
            Self::ConfigValidated => 2,
            Self::PlatformDeployed => 3,
            Self::ComponentsDeployed => 4,
            Self::MonitoringStarted => 5,
            Self::StatusReported => 6,
            Self::Done => 7,
            Self::Aborted { at } => Self::from_kind(at).step_number(),
        }
    }

    const fn from_kind(kind: DeployStageKind) -> Self {
        match kind {
            DeployStageKind::Init => Self::Init,
            DeployStageKind::ReadinessChecked => Self::ReadinessChecked,
            DeployStageKind::ConfigValidated => Self::ConfigValidated,
            DeployStageKind::PlatformDeployed => Self::PlatformDeployed,
            DeployStageKind::ComponentsDeployed => Self::ComponentsDeployed,
            DeployStageKind::MonitoringStarted => Self::MonitoringStarted,
            DeployStageKind::StatusReported => Self::StatusReported,
        }
    }
}

impl std::fmt::Display for DeployStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aborted { at } => write!(
                f,
                "Aborted at: {}",
                Self::from_kind(*at).description()
            ),
            other => write!(f, "{}", other.description()),
        }
    }
}
