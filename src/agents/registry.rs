// Agent Registry - the only writer of FieldAgent and MissionTask state
//
// Each agent sits behind its own async mutex, so one agent's state is mutated by
// at most one operation at a time while different agents proceed independently.
// Case ownership is tracked in a single index checked and updated atomically,
// which keeps every case in at most one itinerary under concurrent dispatch.

use statig::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::agent_lifecycle::{event_towards, status_of, DutyCycle, DutyEvent, MissionStatus};
use crate::agents::route_optimizer::PlannedStop;
use crate::agents::types::{AgentId, AgentStatus, CaseId, FieldAgent, MissionTask};
use crate::errors::RegistryError;
use crate::events::{EventBus, FieldEvent};
use crate::geo::{Displacement, GeoPoint};
use crate::verification::PhotoHandle;
use crate::view::Gated;

struct AgentEntry {
    agent: FieldAgent,
    duty: StateMachine<DutyCycle>,
}

impl AgentEntry {
    /// Fresh entry: offline, unverified, empty itinerary.
    /// Tasks and verification are only ever earned inside this registry.
    fn new(mut agent: FieldAgent) -> Self {
        let duty = DutyCycle::new(agent.id()).state_machine();
        agent.set_status(status_of(duty.state()));
        agent.reset_verification();
        let stale = agent.drain_itinerary();
        if !stale.is_empty() {
            warn!(
                agent_id = %agent.id(),
                dropped_tasks = stale.len(),
                "Discarding itinerary carried by a registered agent"
            );
        }
        Self { agent, duty }
    }

    fn status(&self) -> AgentStatus {
        self.agent.status()
    }

    /// Feed a duty event; returns the new status when it changed
    fn apply(&mut self, event: &DutyEvent) -> Option<AgentStatus> {
        let before = self.status();
        self.duty.handle(event);
        let after = status_of(self.duty.state());
        self.agent.set_status(after);
        (before != after).then_some(after)
    }
}

pub struct AgentRegistry {
    agents: RwLock<HashMap<AgentId, Arc<Mutex<AgentEntry>>>>,
    owners: StdMutex<HashMap<CaseId, AgentId>>,
    sequence: AtomicU64,
    events: EventBus,
    max_displacement_deg: f64,
}

impl AgentRegistry {
    pub fn new(events: EventBus, max_displacement_deg: f64) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            owners: StdMutex::new(HashMap::new()),
            sequence: AtomicU64::new(1),
            events,
            max_displacement_deg,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn max_displacement_deg(&self) -> f64 {
        self.max_displacement_deg
    }

    /// Next dispatch sequence number, strictly increasing
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    fn owners(&self) -> MutexGuard<'_, HashMap<CaseId, AgentId>> {
        // The index holds plain data; a poisoned lock still holds a usable map
        self.owners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn entry(&self, agent_id: &str) -> Result<Arc<Mutex<AgentEntry>>, RegistryError> {
        self.agents
            .read()
            .await
            .get(agent_id)
            .cloned()
            .ok_or_else(|| RegistryError::AgentNotFound(agent_id.to_string()))
    }

    /// Add an agent at shift start. Agents always enter offline, unverified and
    /// with an empty itinerary, whatever the incoming record carries.
    pub async fn register(&self, agent: FieldAgent) -> Result<(), RegistryError> {
        let mut agents = self.agents.write().await;
        if agents.contains_key(agent.id()) {
            return Err(RegistryError::DuplicateAgent(agent.id().to_string()));
        }
        let id = agent.id().to_string();
        agents.insert(id.clone(), Arc::new(Mutex::new(AgentEntry::new(agent))));
        info!(agent_id = %id, "Agent registered");
        Ok(())
    }

    /// Remove an agent at shift end; its open cases return to the pool
    pub async fn deprovision(&self, agent_id: &str) -> Result<FieldAgent, RegistryError> {
        let entry = self
            .agents
            .write()
            .await
            .remove(agent_id)
            .ok_or_else(|| RegistryError::AgentNotFound(agent_id.to_string()))?;

        let mut entry = entry.lock().await;
        let released = entry.agent.drain_itinerary();
        {
            let mut owners = self.owners();
            for task in &released {
                if owners.get(&task.debtor_id).map(String::as_str) == Some(agent_id) {
                    owners.remove(&task.debtor_id);
                }
            }
        }
        entry.apply(&DutyEvent::Override {
            status: AgentStatus::Offline,
        });
        info!(
            agent_id = %agent_id,
            released_tasks = released.len(),
            "Agent deprovisioned"
        );
        Ok(entry.agent.clone())
    }

    /// Snapshot of every agent, ordered by id
    pub async fn list(&self) -> Vec<FieldAgent> {
        let entries: Vec<Arc<Mutex<AgentEntry>>> =
            self.agents.read().await.values().cloned().collect();
        let mut agents = Vec::with_capacity(entries.len());
        for entry in entries {
            agents.push(entry.lock().await.agent.clone());
        }
        agents.sort_by(|a, b| a.id().cmp(b.id()));
        agents
    }

    pub async fn get(&self, agent_id: &str) -> Result<FieldAgent, RegistryError> {
        let entry = self.entry(agent_id).await?;
        let agent = entry.lock().await.agent.clone();
        Ok(agent)
    }

    pub async fn contains(&self, agent_id: &str) -> bool {
        self.agents.read().await.contains_key(agent_id)
    }

    /// Ids of agents currently on duty
    pub async fn on_duty_ids(&self) -> Vec<AgentId> {
        let entries: Vec<(AgentId, Arc<Mutex<AgentEntry>>)> = self
            .agents
            .read()
            .await
            .iter()
            .map(|(id, entry)| (id.clone(), Arc::clone(entry)))
            .collect();
        let mut ids = Vec::new();
        for (id, entry) in entries {
            if entry.lock().await.status().is_on_duty() {
                ids.push(id);
            }
        }
        ids.sort();
        ids
    }

    /// Move an on-duty agent. Offline agents are left untouched and `Ok(None)` is returned.
    pub async fn update_location(
        &self,
        agent_id: &str,
        displacement: Displacement,
    ) -> Result<Option<GeoPoint>, RegistryError> {
        self.record_telemetry(agent_id, displacement, None, None).await
    }

    /// Apply one telemetry reading: bounded displacement plus optional battery and signal
    pub async fn record_telemetry(
        &self,
        agent_id: &str,
        displacement: Displacement,
        battery_level: Option<u8>,
        signal_strength: Option<u8>,
    ) -> Result<Option<GeoPoint>, RegistryError> {
        let entry = self.entry(agent_id).await?;
        let mut entry = entry.lock().await;
        if !entry.status().is_on_duty() {
            return Ok(None);
        }

        if !displacement.is_within(self.max_displacement_deg) {
            return Err(RegistryError::InvalidTelemetry {
                agent_id: agent_id.to_string(),
                reason: format!(
                    "displacement ({}, {}) exceeds ±{}°",
                    displacement.d_lat, displacement.d_lng, self.max_displacement_deg
                ),
            });
        }
        let next = entry.agent.location().offset(&displacement);
        if !next.is_valid() {
            return Err(RegistryError::InvalidTelemetry {
                agent_id: agent_id.to_string(),
                reason: format!("position ({}, {}) is off the globe", next.lat, next.lng),
            });
        }

        entry.agent.move_by(&displacement);
        if let Some(level) = battery_level {
            entry.agent.set_battery(level);
        }
        if let Some(strength) = signal_strength {
            entry.agent.set_signal(strength);
        }

        let location = entry.agent.location().clone();
        self.events.publish(FieldEvent::AgentLocationChanged {
            agent_id: agent_id.to_string(),
            location: Gated::gate(entry.agent.is_identity_verified(), location.clone()),
        });
        Ok(Some(location))
    }

    /// Lawful status change along the duty cycle
    pub async fn set_status(
        &self,
        agent_id: &str,
        status: AgentStatus,
    ) -> Result<AgentStatus, RegistryError> {
        let entry = self.entry(agent_id).await?;
        let mut entry = entry.lock().await;
        let from = entry.status();
        if from == status {
            return Ok(status);
        }

        let invalid = || RegistryError::InvalidTransition {
            agent_id: agent_id.to_string(),
            from: from.to_string(),
            to: status.to_string(),
        };
        let event = event_towards(from, status).ok_or_else(invalid)?;
        // busy and on-site are entered only by advancing an itinerary task
        if matches!(event, DutyEvent::Depart | DutyEvent::Arrive) {
            return Err(invalid());
        }
        if event == DutyEvent::Release {
            if let Some(active) = entry.agent.active_task() {
                return Err(RegistryError::ActiveTaskInProgress {
                    agent_id: agent_id.to_string(),
                    task_id: active.id.clone(),
                });
            }
        }

        match entry.apply(&event) {
            Some(new_status) => {
                self.publish_status(&entry.agent);
                Ok(new_status)
            }
            None => Err(invalid()),
        }
    }

    /// Operator override: force a status regardless of the duty cycle
    pub async fn override_status(
        &self,
        agent_id: &str,
        status: AgentStatus,
    ) -> Result<AgentStatus, RegistryError> {
        let entry = self.entry(agent_id).await?;
        let mut entry = entry.lock().await;
        if entry.apply(&DutyEvent::Override { status }).is_some() {
            warn!(agent_id = %agent_id, status = %status, "Agent status overridden by operator");
            self.publish_status(&entry.agent);
        }
        Ok(entry.status())
    }

    /// Put a task at the head of an agent's itinerary, claiming its case
    pub async fn append_task(
        &self,
        agent_id: &str,
        task: MissionTask,
    ) -> Result<MissionTask, RegistryError> {
        let entry = self.entry(agent_id).await?;
        let mut entry = entry.lock().await;
        if !entry.status().is_on_duty() {
            return Err(RegistryError::AgentOffline(agent_id.to_string()));
        }

        {
            let mut owners = self.owners();
            if let Some(owner) = owners.get(&task.debtor_id) {
                return Err(RegistryError::AlreadyAssigned {
                    case_id: task.debtor_id.clone(),
                    owner: owner.clone(),
                });
            }
            owners.insert(task.debtor_id.clone(), agent_id.to_string());
        }

        entry.agent.push_front(task.clone());
        debug!(
            agent_id = %agent_id,
            task_id = %task.id,
            case_id = %task.debtor_id,
            "Task added to itinerary"
        );
        Ok(task)
    }

    /// Drop a task from an itinerary without settling it; the case returns to the pool
    pub async fn remove_task(
        &self,
        agent_id: &str,
        task_id: &str,
    ) -> Result<MissionTask, RegistryError> {
        let entry = self.entry(agent_id).await?;
        let mut entry = entry.lock().await;
        let task = entry
            .agent
            .take_task(task_id)
            .ok_or_else(|| RegistryError::TaskNotFound {
                agent_id: agent_id.to_string(),
                task_id: task_id.to_string(),
            })?;
        self.release_case(&task.debtor_id, agent_id);

        if task.status.is_active() && entry.apply(&DutyEvent::Release).is_some() {
            self.publish_status(&entry.agent);
        }
        info!(agent_id = %agent_id, task_id = %task_id, "Task removed from itinerary");
        Ok(task)
    }

    /// Move a task along its lifecycle, driving the agent's duty cycle with it.
    /// Terminal tasks leave the itinerary and release their case.
    pub async fn advance_task(
        &self,
        agent_id: &str,
        task_id: &str,
        next: MissionStatus,
        proof_url: Option<String>,
    ) -> Result<MissionTask, RegistryError> {
        let entry = self.entry(agent_id).await?;
        let mut entry = entry.lock().await;

        let current = entry
            .agent
            .task(task_id)
            .map(|t| t.status)
            .ok_or_else(|| RegistryError::TaskNotFound {
                agent_id: agent_id.to_string(),
                task_id: task_id.to_string(),
            })?;

        if !current.can_advance_to(next) {
            return Err(RegistryError::InvalidTransition {
                agent_id: agent_id.to_string(),
                from: current.to_string(),
                to: next.to_string(),
            });
        }
        if next.is_active() {
            if !entry.status().is_on_duty() {
                return Err(RegistryError::AgentOffline(agent_id.to_string()));
            }
            if let Some(active) = entry.agent.active_task().filter(|t| t.id != task_id) {
                return Err(RegistryError::ActiveTaskInProgress {
                    agent_id: agent_id.to_string(),
                    task_id: active.id.clone(),
                });
            }
        }

        // All checks passed; from here on nothing fails
        let status_changed = current
            .duty_event(next)
            .and_then(|event| entry.apply(&event))
            .is_some();

        let task = if next.is_terminal() {
            let mut task = entry
                .agent
                .take_task(task_id)
                .ok_or_else(|| RegistryError::TaskNotFound {
                    agent_id: agent_id.to_string(),
                    task_id: task_id.to_string(),
                })?;
            task.status = next;
            if next == MissionStatus::Completed {
                task.proof_url = proof_url;
                entry.agent.record_visit();
            }
            self.release_case(&task.debtor_id, agent_id);
            task
        } else {
            let task = entry
                .agent
                .task_mut(task_id)
                .ok_or_else(|| RegistryError::TaskNotFound {
                    agent_id: agent_id.to_string(),
                    task_id: task_id.to_string(),
                })?;
            task.status = next;
            task.clone()
        };

        info!(
            agent_id = %agent_id,
            task_id = %task_id,
            from = %current,
            to = %next,
            "Task status changed"
        );
        self.events.publish(FieldEvent::TaskStatusChanged {
            agent_id: agent_id.to_string(),
            task_id: task.id.clone(),
            case_id: task.debtor_id.clone(),
            status: Gated::gate(entry.agent.is_identity_verified(), next),
        });
        if status_changed {
            self.publish_status(&entry.agent);
        }
        Ok(task)
    }

    /// Reorder an itinerary under the agent's lock.
    /// The planner sees the current position and itinerary and returns a permutation
    /// of task ids with ETAs; statuses are never touched.
    pub async fn replan<F>(&self, agent_id: &str, planner: F) -> Result<Vec<MissionTask>, RegistryError>
    where
        F: FnOnce(&GeoPoint, &[MissionTask]) -> Vec<PlannedStop>,
    {
        let entry = self.entry(agent_id).await?;
        let mut entry = entry.lock().await;
        let plan = planner(entry.agent.location(), entry.agent.itinerary());

        let current = entry.agent.itinerary();
        let planned_ids: HashSet<&str> = plan.iter().map(|s| s.task_id.as_str()).collect();
        if plan.len() != current.len()
            || planned_ids.len() != plan.len()
            || current.iter().any(|t| !planned_ids.contains(t.id.as_str()))
        {
            return Err(RegistryError::PlanMismatch(agent_id.to_string()));
        }

        let mut by_id: HashMap<String, MissionTask> = entry
            .agent
            .drain_itinerary()
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();
        let mut ordered = Vec::with_capacity(plan.len());
        for stop in plan {
            if let Some(mut task) = by_id.remove(&stop.task_id) {
                task.eta_minutes = stop.eta_minutes;
                ordered.push(task);
            }
        }
        entry.agent.replace_itinerary(ordered.clone());
        Ok(ordered)
    }

    /// Attach a confirmed verification photo. Only the verification gate calls this.
    pub(crate) async fn confirm_identity(
        &self,
        agent_id: &str,
        photo: PhotoHandle,
    ) -> Result<(), RegistryError> {
        let entry = self.entry(agent_id).await?;
        let mut entry = entry.lock().await;
        entry.agent.attach_verification(photo);
        info!(agent_id = %agent_id, "Agent identity verified");
        self.events.publish(FieldEvent::VerificationConfirmed {
            agent_id: agent_id.to_string(),
        });
        self.publish_status(&entry.agent);
        Ok(())
    }

    pub fn owner_of(&self, case_id: &str) -> Option<AgentId> {
        self.owners().get(case_id).cloned()
    }

    /// Cases currently present in some itinerary
    pub fn assigned_cases(&self) -> HashSet<CaseId> {
        self.owners().keys().cloned().collect()
    }

    fn release_case(&self, case_id: &str, agent_id: &str) {
        let mut owners = self.owners();
        if owners.get(case_id).map(String::as_str) == Some(agent_id) {
            owners.remove(case_id);
        }
    }

    fn publish_status(&self, agent: &FieldAgent) {
        info!(agent_id = %agent.id(), status = %agent.status(), "Agent status changed");
        self.events.publish(FieldEvent::AgentStatusChanged {
            agent_id: agent.id().to_string(),
            status: Gated::gate(agent.is_identity_verified(), agent.status()),
        });
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("assigned_cases", &self.owners().len())
            .field("max_displacement_deg", &self.max_displacement_deg)
            .finish()
    }
}
