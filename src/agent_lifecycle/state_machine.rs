use serde::{Deserialize, Serialize};
use statig::prelude::*;

use crate::agents::types::AgentStatus;

/// Events driving an agent's duty cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DutyEvent {
    /// Shift start, the agent comes on duty
    ClockIn,
    /// A task went en-route
    Depart,
    /// A task reached on-site
    Arrive,
    /// The active task completed or failed
    Release,
    /// Shift end
    ClockOut,
    /// Operator override, the only backward path
    Override { status: AgentStatus },
}

/// Context of the per-agent duty state machine
#[derive(Debug, Default)]
pub struct DutyCycle {
    pub agent_id: String,
    pub transitions: u32,
}

impl DutyCycle {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            ..Default::default()
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }
}

#[state_machine(initial = "State::offline()", state(derive(Debug, Clone, PartialEq, Eq)))]
impl DutyCycle {
    #[state]
    fn offline(&mut self, event: &DutyEvent) -> Outcome<State> {
        match event {
            DutyEvent::ClockIn => {
                self.transitions += 1;
                tracing::info!(agent_id = %self.agent_id, "Agent clocked in");
                Transition(State::online())
            }
            DutyEvent::Override { status } => self.force(*status),
            _ => Handled,
        }
    }

    #[state]
    fn online(&mut self, event: &DutyEvent) -> Outcome<State> {
        match event {
            DutyEvent::Depart => {
                self.transitions += 1;
                tracing::info!(agent_id = %self.agent_id, "Agent departed for a visit");
                Transition(State::busy())
            }
            DutyEvent::Arrive => {
                self.transitions += 1;
                tracing::info!(agent_id = %self.agent_id, "Agent arrived on site");
                Transition(State::on_site())
            }
            DutyEvent::ClockOut => {
                self.transitions += 1;
                tracing::info!(agent_id = %self.agent_id, "Agent clocked out");
                Transition(State::offline())
            }
            DutyEvent::Override { status } => self.force(*status),
            _ => Handled,
        }
    }

    #[state]
    fn busy(&mut self, event: &DutyEvent) -> Outcome<State> {
        match event {
            DutyEvent::Arrive => {
                self.transitions += 1;
                tracing::info!(agent_id = %self.agent_id, "Agent arrived on site");
                Transition(State::on_site())
            }
            DutyEvent::Release => {
                self.transitions += 1;
                tracing::info!(agent_id = %self.agent_id, "Agent released from visit");
                Transition(State::online())
            }
            DutyEvent::Override { status } => self.force(*status),
            _ => Handled,
        }
    }

    #[state]
    fn on_site(&mut self, event: &DutyEvent) -> Outcome<State> {
        match event {
            DutyEvent::Release => {
                self.transitions += 1;
                tracing::info!(agent_id = %self.agent_id, "Agent left site");
                Transition(State::online())
            }
            DutyEvent::Override { status } => self.force(*status),
            _ => Handled,
        }
    }
}

impl DutyCycle {
    fn force(&mut self, status: AgentStatus) -> Outcome<State> {
        self.transitions += 1;
        tracing::warn!(agent_id = %self.agent_id, status = %status, "Operator override of agent status");
        Transition(state_for(status))
    }
}

/// Target state for a status
pub fn state_for(status: AgentStatus) -> State {
    match status {
        AgentStatus::Offline => State::offline(),
        AgentStatus::Online => State::online(),
        AgentStatus::Busy => State::busy(),
        AgentStatus::OnSite => State::on_site(),
    }
}

/// Status reported for a state
pub fn status_of(state: &State) -> AgentStatus {
    match state {
        State::Offline { .. } => AgentStatus::Offline,
        State::Online { .. } => AgentStatus::Online,
        State::Busy { .. } => AgentStatus::Busy,
        State::OnSite { .. } => AgentStatus::OnSite,
    }
}

/// Event that lawfully moves an agent from `from` to `to`, if there is one
pub fn event_towards(from: AgentStatus, to: AgentStatus) -> Option<DutyEvent> {
    match (from, to) {
        (AgentStatus::Offline, AgentStatus::Online) => Some(DutyEvent::ClockIn),
        (AgentStatus::Online, AgentStatus::Busy) => Some(DutyEvent::Depart),
        (AgentStatus::Online, AgentStatus::OnSite) | (AgentStatus::Busy, AgentStatus::OnSite) => {
            Some(DutyEvent::Arrive)
        }
        (AgentStatus::Busy, AgentStatus::Online) | (AgentStatus::OnSite, AgentStatus::Online) => {
            Some(DutyEvent::Release)
        }
        (AgentStatus::Online, AgentStatus::Offline) => Some(DutyEvent::ClockOut),
        _ => None,
    }
}
