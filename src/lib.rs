// Field Dispatch Library - field agent dispatch and live tracking
// This exposes the core components for testing and integration

pub mod agent_lifecycle;
pub mod agents;
pub mod cli;
pub mod config;
pub mod errors;
pub mod events;
pub mod geo;
pub mod observability;
pub mod priority;
pub mod roster;
pub mod shutdown;
pub mod telemetry;
pub mod tracking;
pub mod verification;
pub mod view;

// Re-export key types for easy access
pub use agent_lifecycle::{DutyCycle, DutyEvent, MissionStatus};
pub use agents::{
    AgentRegistry, AgentStatus, CaseFeed, CaseRecord, DispatchCoordinator, DispatchEngine,
    FieldAgent, MissionTask, RouteOptimizer, StaticPortfolio, TaskPool,
};
pub use config::{config, init_config, FieldDispatchConfig};
pub use errors::{DispatchError, ErrorKind, OptimizeError, RegistryError, TelemetryError, VerificationError};
pub use events::{EventBus, FieldEvent, Notice, Severity};
pub use geo::{Displacement, GeoPoint};
pub use observability::{DispatchMetrics, OperationTimer};
pub use priority::{RiskTier, TaskPriority};
pub use roster::{AgentSeed, ShiftManifest};
pub use shutdown::ShutdownCoordinator;
pub use telemetry::{create_dispatch_span, generate_correlation_id, init_telemetry, shutdown_telemetry};
pub use tracking::{GeoClock, PositionFrame, PositionSource, RandomWalk, TelemetrySample};
pub use verification::{Camera, CameraDevice, PhotoHandle, SimulatedCamera, VerificationGate, VerificationPhase};
pub use view::{FieldAgentView, Gated};
