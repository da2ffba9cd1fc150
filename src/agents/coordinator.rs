// Dispatch Coordinator - the operator-facing surface of the engine
//
// Wires the registry, task pool, dispatch engine, route optimizer and
// verification gate together. Every operator action runs in its own span, is
// counted, and on failure raises a notice naming the operation and the reason.

use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, Instrument};

use crate::agent_lifecycle::MissionStatus;
use crate::agents::dispatch::DispatchEngine;
use crate::agents::registry::AgentRegistry;
use crate::agents::route_optimizer::RouteOptimizer;
use crate::agents::task_pool::{CaseFeed, TaskPool};
use crate::agents::types::{AgentStatus, CaseRecord, FieldAgent, MissionTask};
use crate::config::FieldDispatchConfig;
use crate::errors::{DispatchError, OptimizeError, RegistryError, VerificationError};
use crate::events::{EventBus, Notice, Severity};
use crate::observability::{DispatchMetrics, OperationTimer};
use crate::roster::ShiftManifest;
use crate::telemetry::{create_dispatch_span, generate_correlation_id};
use crate::tracking::{GeoClock, PositionSource};
use crate::verification::{Camera, PhotoHandle, VerificationGate, VerificationPhase};
use crate::view::FieldAgentView;

pub struct DispatchCoordinator {
    registry: Arc<AgentRegistry>,
    pool: Arc<TaskPool>,
    dispatcher: DispatchEngine,
    optimizer: RouteOptimizer,
    gate: VerificationGate,
    events: EventBus,
    metrics: Arc<DispatchMetrics>,
    settings: FieldDispatchConfig,
}

impl DispatchCoordinator {
    pub fn new(settings: &FieldDispatchConfig, feed: Arc<dyn CaseFeed>, camera: Camera) -> Self {
        let events = EventBus::new(
            settings.events.channel_capacity,
            settings.events.notice_ttl(),
            settings.events.notice_capacity,
        );
        let registry = Arc::new(AgentRegistry::new(
            events.clone(),
            settings.tracking.max_displacement_deg,
        ));
        let pool = Arc::new(TaskPool::new(
            feed,
            settings.dispatch.eligible_risk_tiers.clone(),
        ));

        Self {
            dispatcher: DispatchEngine::new(Arc::clone(&registry), Arc::clone(&pool)),
            optimizer: RouteOptimizer::new(
                Arc::clone(&registry),
                settings.optimizer.average_speed_kmh,
            ),
            gate: VerificationGate::new(Arc::clone(&registry), camera),
            registry,
            pool,
            events,
            metrics: Arc::new(DispatchMetrics::new()),
            settings: settings.clone(),
        }
    }

    /// Coordinator backed by a shift manifest: its cases become the portfolio and
    /// its agents are registered.
    pub async fn from_manifest(
        settings: &FieldDispatchConfig,
        manifest: &ShiftManifest,
        camera: Camera,
    ) -> anyhow::Result<Self> {
        let coordinator = Self::new(settings, Arc::new(manifest.portfolio()), camera);
        coordinator.import_manifest(manifest).await?;
        Ok(coordinator)
    }

    /// Register the manifest's agents and restore their itineraries and statuses
    pub async fn import_manifest(&self, manifest: &ShiftManifest) -> anyhow::Result<usize> {
        manifest.validate()?;
        for seed in &manifest.agents {
            self.registry.register(seed.to_agent()).await?;
            if seed.status == AgentStatus::Offline && seed.itinerary.is_empty() {
                continue;
            }
            self.registry.set_status(&seed.id, AgentStatus::Online).await?;

            // Head insertion, so the first stop goes in last
            let mut head = None;
            for case_id in seed.itinerary.iter().rev() {
                let case = manifest
                    .case(case_id)
                    .ok_or_else(|| anyhow::anyhow!("unknown case {case_id}"))?;
                let task = MissionTask::from_case(case, self.registry.next_sequence());
                head = Some(self.registry.append_task(&seed.id, task).await?.id);
            }

            match (seed.status, head) {
                (AgentStatus::Online, _) => {}
                (AgentStatus::Offline, _) => {
                    self.registry.set_status(&seed.id, AgentStatus::Offline).await?;
                }
                (status @ (AgentStatus::Busy | AgentStatus::OnSite), Some(task_id)) => {
                    self.registry
                        .advance_task(&seed.id, &task_id, MissionStatus::EnRoute, None)
                        .await?;
                    if status == AgentStatus::OnSite {
                        self.registry
                            .advance_task(&seed.id, &task_id, MissionStatus::OnSite, None)
                            .await?;
                    }
                }
                (status, None) => {
                    self.registry.override_status(&seed.id, status).await?;
                }
            }
        }

        info!(
            agents = manifest.agents.len(),
            cases = manifest.cases.len(),
            "Shift manifest imported"
        );
        Ok(manifest.agents.len())
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    pub fn recent_notices(&self) -> Vec<Notice> {
        self.events.recent_notices()
    }

    async fn surface<T, E: std::fmt::Display>(&self, operation: &str, result: Result<T, E>) -> Result<T, E> {
        if let Err(e) = &result {
            self.events.notify_failure(operation, e).await;
        }
        result
    }

    /// Public views of every agent, locked for unverified ones
    pub async fn list_agents(&self) -> Vec<FieldAgentView> {
        self.registry
            .list()
            .await
            .iter()
            .map(FieldAgentView::from)
            .collect()
    }

    pub async fn agent_view(&self, agent_id: &str) -> Result<FieldAgentView, RegistryError> {
        let agent = self.registry.get(agent_id).await?;
        Ok(FieldAgentView::from(&agent))
    }

    /// Eligible cases not in any itinerary
    pub async fn task_pool(&self) -> Result<Vec<CaseRecord>, DispatchError> {
        let result = self.pool.snapshot(&self.registry.assigned_cases()).await;
        self.surface("task pool", result).await
    }

    pub async fn dispatch(
        &self,
        agent_id: Option<&str>,
        case_id: &str,
    ) -> Result<MissionTask, DispatchError> {
        let correlation_id = generate_correlation_id();
        let span = create_dispatch_span("dispatch", agent_id, Some(case_id), Some(&correlation_id));

        async move {
            let timer = OperationTimer::new("dispatch");
            let result = self.dispatcher.dispatch(agent_id, case_id).await;
            timer.finish();

            match &result {
                Ok(task) => {
                    self.metrics.record_dispatch();
                    self.events
                        .notify(
                            Severity::Normal,
                            "dispatch",
                            format!("{} dispatched to {}", task.debtor_name, agent_id.unwrap_or_default()),
                        )
                        .await;
                }
                Err(_) => self.metrics.record_rejected_dispatch(),
            }
            self.surface("dispatch", result).await
        }
        .instrument(span)
        .await
    }

    pub async fn optimize_route(
        &self,
        agent_id: Option<&str>,
    ) -> Result<Vec<MissionTask>, OptimizeError> {
        let correlation_id = generate_correlation_id();
        let span = create_dispatch_span("optimize", agent_id, None, Some(&correlation_id));

        async move {
            let started = Instant::now();
            let timer = OperationTimer::new("optimize");
            let result = match agent_id {
                Some(agent_id) => self.optimizer.optimize(agent_id).await,
                None => Err(OptimizeError::NoAgentSelected),
            };
            timer.finish();

            // Keep a progress indicator up for at least the configured floor
            let floor = self.settings.optimizer.min_visible_duration();
            if let Some(remaining) = floor.checked_sub(started.elapsed()) {
                tokio::time::sleep(remaining).await;
            }

            if let Ok(itinerary) = &result {
                self.metrics.record_optimization();
                self.events
                    .notify(
                        Severity::Normal,
                        "optimize",
                        format!("Route optimized: {} stops", itinerary.len()),
                    )
                    .await;
            }
            self.surface("optimize", result).await
        }
        .instrument(span)
        .await
    }

    pub async fn begin_verification(&self, agent_id: &str) -> Result<(), VerificationError> {
        let span = create_dispatch_span("begin_verification", Some(agent_id), None, None);
        let result = self.gate.begin_verification(agent_id).instrument(span).await;
        if result.is_err() {
            self.metrics.record_failed_verification();
        }
        self.surface("verification", result).await
    }

    pub async fn capture_verification(&self, agent_id: &str) -> Result<PhotoHandle, VerificationError> {
        let span = create_dispatch_span("capture_verification", Some(agent_id), None, None);
        let result = self.gate.capture_verification(agent_id).instrument(span).await;
        if result.is_err() {
            self.metrics.record_failed_verification();
        }
        self.surface("verification", result).await
    }

    pub async fn cancel_verification(&self, agent_id: &str) -> Result<(), VerificationError> {
        let result = self.gate.cancel_verification(agent_id).await;
        self.surface("verification", result).await
    }

    pub async fn confirm_verification(
        &self,
        agent_id: &str,
        photo: &PhotoHandle,
    ) -> Result<(), VerificationError> {
        let correlation_id = generate_correlation_id();
        let span = create_dispatch_span(
            "confirm_verification",
            Some(agent_id),
            None,
            Some(&correlation_id),
        );
        let result = self
            .gate
            .confirm_verification(agent_id, photo)
            .instrument(span)
            .await;
        match &result {
            Ok(()) => {
                self.metrics.record_verification();
                self.events
                    .notify(
                        Severity::Normal,
                        "verification",
                        format!("Identity confirmed for {agent_id}"),
                    )
                    .await;
            }
            Err(_) => self.metrics.record_failed_verification(),
        }
        self.surface("verification", result).await
    }

    pub async fn verification_phase(&self, agent_id: &str) -> VerificationPhase {
        self.gate.phase(agent_id).await
    }

    pub async fn advance_task(
        &self,
        agent_id: &str,
        task_id: &str,
        status: MissionStatus,
        proof_url: Option<String>,
    ) -> Result<MissionTask, RegistryError> {
        let span = create_dispatch_span("advance_task", Some(agent_id), None, None);
        let result = self
            .registry
            .advance_task(agent_id, task_id, status, proof_url)
            .instrument(span)
            .await;
        self.surface("task update", result).await
    }

    pub async fn set_status(
        &self,
        agent_id: &str,
        status: AgentStatus,
    ) -> Result<AgentStatus, RegistryError> {
        let result = self.registry.set_status(agent_id, status).await;
        self.surface("status change", result).await
    }

    pub async fn override_status(
        &self,
        agent_id: &str,
        status: AgentStatus,
    ) -> Result<AgentStatus, RegistryError> {
        let result = self.registry.override_status(agent_id, status).await;
        self.surface("status override", result).await
    }

    /// Remove an agent at shift end; its open cases return to the pool
    pub async fn deprovision(&self, agent_id: &str) -> Result<FieldAgent, RegistryError> {
        let result = self.registry.deprovision(agent_id).await;
        if result.is_ok() {
            self.gate.forget(agent_id).await;
        }
        self.surface("deprovision", result).await
    }

    /// A geo clock driving this coordinator's agents from `source`
    pub fn geo_clock(&self, source: Arc<dyn PositionSource>) -> Arc<GeoClock> {
        Arc::new(GeoClock::new(
            Arc::clone(&self.registry),
            source,
            self.settings.tracking.tick_interval(),
            self.settings.tracking.frame_buffer,
            Arc::clone(&self.metrics),
        ))
    }
}
