// Error taxonomy for the dispatch engine.
// Every variant is recoverable by the operator; none of them abort the process.

use serde::Serialize;
use thiserror::Error;

/// Operator-facing classification shared by all operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    NoAgentSelected,
    AgentOffline,
    AlreadyAssigned,
    TaskNotFound,
    CameraUnavailable,
    VerificationNotConfirmed,
    AgentNotFound,
    InvalidTransition,
    InvalidTelemetry,
    Upstream,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("agent {0} not found")]
    AgentNotFound(String),
    #[error("agent {0} is already registered")]
    DuplicateAgent(String),
    #[error("agent {0} is offline")]
    AgentOffline(String),
    #[error("case {case_id} is already assigned to {owner}")]
    AlreadyAssigned { case_id: String, owner: String },
    #[error("task {task_id} is not in the itinerary of {agent_id}")]
    TaskNotFound { agent_id: String, task_id: String },
    #[error("agent {agent_id} cannot move from {from} to {to}")]
    InvalidTransition {
        agent_id: String,
        from: String,
        to: String,
    },
    #[error("agent {agent_id} is already working task {task_id}")]
    ActiveTaskInProgress { agent_id: String, task_id: String },
    #[error("rejected telemetry for {agent_id}: {reason}")]
    InvalidTelemetry { agent_id: String, reason: String },
    #[error("planned route for {0} does not match its itinerary")]
    PlanMismatch(String),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::AgentNotFound(_) => ErrorKind::AgentNotFound,
            RegistryError::DuplicateAgent(_) => ErrorKind::InvalidTransition,
            RegistryError::AgentOffline(_) => ErrorKind::AgentOffline,
            RegistryError::AlreadyAssigned { .. } => ErrorKind::AlreadyAssigned,
            RegistryError::TaskNotFound { .. } => ErrorKind::TaskNotFound,
            RegistryError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            RegistryError::ActiveTaskInProgress { .. } => ErrorKind::InvalidTransition,
            RegistryError::InvalidTelemetry { .. } => ErrorKind::InvalidTelemetry,
            RegistryError::PlanMismatch(_) => ErrorKind::InvalidTransition,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("no agent selected for dispatch")]
    NoAgentSelected,
    #[error("agent {0} is offline")]
    AgentOffline(String),
    #[error("case {case_id} is already assigned to {owner}")]
    AlreadyAssigned { case_id: String, owner: String },
    #[error("case {0} is not in the task pool")]
    TaskNotFound(String),
    #[error("case portfolio unavailable: {0}")]
    PortfolioUnavailable(String),
    #[error(transparent)]
    Registry(RegistryError),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::NoAgentSelected => ErrorKind::NoAgentSelected,
            DispatchError::AgentOffline(_) => ErrorKind::AgentOffline,
            DispatchError::AlreadyAssigned { .. } => ErrorKind::AlreadyAssigned,
            DispatchError::TaskNotFound(_) => ErrorKind::TaskNotFound,
            DispatchError::PortfolioUnavailable(_) => ErrorKind::Upstream,
            DispatchError::Registry(e) => e.kind(),
        }
    }
}

impl From<RegistryError> for DispatchError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AgentNotFound(_) => DispatchError::NoAgentSelected,
            RegistryError::AgentOffline(agent_id) => DispatchError::AgentOffline(agent_id),
            RegistryError::AlreadyAssigned { case_id, owner } => {
                DispatchError::AlreadyAssigned { case_id, owner }
            }
            other => DispatchError::Registry(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    #[error("no agent selected for route optimization")]
    NoAgentSelected,
    #[error(transparent)]
    Registry(RegistryError),
}

impl OptimizeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OptimizeError::NoAgentSelected => ErrorKind::NoAgentSelected,
            OptimizeError::Registry(e) => e.kind(),
        }
    }
}

impl From<RegistryError> for OptimizeError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AgentNotFound(_) => OptimizeError::NoAgentSelected,
            other => OptimizeError::Registry(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VerificationError {
    #[error("no agent selected for verification")]
    NoAgentSelected,
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),
    #[error("verification for {0} is already in progress")]
    AttemptInProgress(String),
    #[error("camera is not capturing for {0}")]
    NotCapturing(String),
    #[error("verification for {0} has no captured photo to confirm")]
    VerificationNotConfirmed(String),
    #[error(transparent)]
    Registry(RegistryError),
}

impl VerificationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VerificationError::NoAgentSelected => ErrorKind::NoAgentSelected,
            VerificationError::CameraUnavailable(_) => ErrorKind::CameraUnavailable,
            VerificationError::AttemptInProgress(_) | VerificationError::NotCapturing(_) => {
                ErrorKind::CameraUnavailable
            }
            VerificationError::VerificationNotConfirmed(_) => ErrorKind::VerificationNotConfirmed,
            VerificationError::Registry(e) => e.kind(),
        }
    }
}

impl From<RegistryError> for VerificationError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AgentNotFound(_) => VerificationError::NoAgentSelected,
            other => VerificationError::Registry(other),
        }
    }
}

/// Failure reading a position sample from the telemetry source
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TelemetryError {
    #[error("no telemetry available for {0}")]
    NoSignal(String),
    #[error("malformed sample for {agent_id}: {reason}")]
    Malformed { agent_id: String, reason: String },
}
