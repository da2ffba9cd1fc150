// Agent registry, task pool, dispatch and routing for the field workforce

pub mod coordinator;
pub mod dispatch;
pub mod registry;
pub mod route_optimizer;
pub mod task_pool;
pub mod types;

pub use coordinator::DispatchCoordinator;
pub use dispatch::DispatchEngine;
pub use registry::AgentRegistry;
pub use route_optimizer::{plan_route, PlannedStop, RouteOptimizer};
pub use task_pool::{compute_pool, CaseFeed, StaticPortfolio, TaskPool};
pub use types::{
    AgentId, AgentStatus, CaseId, CaseRecord, FieldAgent, MissionTask, PerformanceMetrics, TaskId,
};
