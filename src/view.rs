// Public view contract for agents.
// Live position and status leave the engine only for identity-verified agents.

use serde::Serialize;

use crate::agents::types::{AgentStatus, FieldAgent, MissionTask, PerformanceMetrics};
use crate::geo::GeoPoint;
use crate::priority::TaskPriority;

/// Placeholder label shown instead of live state
pub const LOCKED_PLACEHOLDER: &str = "identity-unverified";

/// A value that is only readable once the agent is verified
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "visibility", content = "value", rename_all = "lowercase")]
pub enum Gated<T> {
    Visible(T),
    Locked,
}

impl<T> Gated<T> {
    pub fn gate(verified: bool, value: T) -> Self {
        if verified {
            Gated::Visible(value)
        } else {
            Gated::Locked
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, Gated::Locked)
    }

    pub fn visible(&self) -> Option<&T> {
        match self {
            Gated::Visible(value) => Some(value),
            Gated::Locked => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItinerarySummary {
    pub open_tasks: usize,
    pub high_priority: usize,
    pub next_stop: Option<String>,
}

impl ItinerarySummary {
    pub fn of(itinerary: &[MissionTask]) -> Self {
        Self {
            open_tasks: itinerary.len(),
            high_priority: itinerary
                .iter()
                .filter(|t| t.priority == TaskPriority::High)
                .count(),
            next_stop: itinerary.first().map(|t| t.debtor_name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveAgentView {
    pub id: String,
    pub name: String,
    pub status: AgentStatus,
    pub location: GeoPoint,
    pub battery_level: u8,
    pub signal_strength: u8,
    pub itinerary: ItinerarySummary,
    pub metrics: PerformanceMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedAgentView {
    pub id: String,
    pub name: String,
    pub placeholder: &'static str,
    pub itinerary: ItinerarySummary,
}

/// What the presentation layer gets for one agent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum FieldAgentView {
    Live(LiveAgentView),
    Locked(LockedAgentView),
}

impl FieldAgentView {
    pub fn id(&self) -> &str {
        match self {
            FieldAgentView::Live(v) => &v.id,
            FieldAgentView::Locked(v) => &v.id,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, FieldAgentView::Locked(_))
    }

    pub fn location(&self) -> Option<&GeoPoint> {
        match self {
            FieldAgentView::Live(v) => Some(&v.location),
            FieldAgentView::Locked(_) => None,
        }
    }

    pub fn status(&self) -> Option<AgentStatus> {
        match self {
            FieldAgentView::Live(v) => Some(v.status),
            FieldAgentView::Locked(_) => None,
        }
    }
}

impl From<&FieldAgent> for FieldAgentView {
    fn from(agent: &FieldAgent) -> Self {
        let itinerary = ItinerarySummary::of(agent.itinerary());
        if !agent.is_identity_verified() {
            return FieldAgentView::Locked(LockedAgentView {
                id: agent.id().to_string(),
                name: agent.name().to_string(),
                placeholder: LOCKED_PLACEHOLDER,
                itinerary,
            });
        }
        FieldAgentView::Live(LiveAgentView {
            id: agent.id().to_string(),
            name: agent.name().to_string(),
            status: agent.status(),
            location: agent.location().clone(),
            battery_level: agent.battery_level(),
            signal_strength: agent.signal_strength(),
            itinerary,
            metrics: agent.metrics().clone(),
        })
    }
}
