// Field agent and mission task records.
// Fields are read through accessors; only the registry mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::agent_lifecycle::MissionStatus;
use crate::geo::{Displacement, GeoPoint};
use crate::priority::{RiskTier, TaskPriority};
use crate::verification::PhotoHandle;

pub type AgentId = String;
pub type CaseId = String;
pub type TaskId = String;

/// Operational status of a field agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentStatus {
    Online,
    Busy,
    OnSite,
    #[default]
    Offline,
}

impl AgentStatus {
    /// On-duty agents receive location updates and dispatches
    pub fn is_on_duty(self) -> bool {
        !matches!(self, AgentStatus::Offline)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AgentStatus::Online => "online",
            AgentStatus::Busy => "busy",
            AgentStatus::OnSite => "on-site",
            AgentStatus::Offline => "offline",
        };
        write!(f, "{}", label)
    }
}

/// Aggregate performance figures carried on the agent record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// Share of visits where the debtor was contacted, 0.0 to 1.0
    #[serde(default)]
    pub contact_rate: f32,
    /// Mean visit duration in minutes
    #[serde(default)]
    pub avg_duration_minutes: f32,
    /// Share of visits ending in a recovery, 0.0 to 1.0
    #[serde(default)]
    pub recovery_rate: f32,
    #[serde(default)]
    pub visits_completed: u32,
}

/// A case record as exported by the case-management system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    pub id: CaseId,
    pub name: String,
    pub address: String,
    pub risk_tier: RiskTier,
    /// Geocode of the address, when the feed has one
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

/// A visit to a debtor's address, owned by at most one itinerary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionTask {
    pub id: TaskId,
    pub debtor_id: CaseId,
    pub debtor_name: String,
    pub address: String,
    pub location: Option<GeoPoint>,
    pub status: MissionStatus,
    pub priority: TaskPriority,
    /// Minutes from the agent's position along the planned route
    pub eta_minutes: Option<u32>,
    pub proof_url: Option<String>,
    pub dispatched_at: DateTime<Utc>,
    /// Dispatch order, used to break route ties
    pub sequence: u64,
}

impl MissionTask {
    /// Fresh pending task for a pooled case
    pub fn from_case(case: &CaseRecord, sequence: u64) -> Self {
        let short = uuid::Uuid::new_v4().simple().to_string();
        Self {
            id: format!("MT-{}", &short[..8]),
            debtor_id: case.id.clone(),
            debtor_name: case.name.clone(),
            address: case.address.clone(),
            location: case.location.clone(),
            status: MissionStatus::Pending,
            priority: TaskPriority::from_risk_tier(case.risk_tier),
            eta_minutes: None,
            proof_url: None,
            dispatched_at: Utc::now(),
            sequence,
        }
    }
}

/// Live record of a field agent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAgent {
    id: AgentId,
    name: String,
    status: AgentStatus,
    location: GeoPoint,
    battery_level: u8,
    signal_strength: u8,
    itinerary: Vec<MissionTask>,
    is_identity_verified: bool,
    last_verification_photo: Option<PhotoHandle>,
    metrics: PerformanceMetrics,
}

impl FieldAgent {
    /// New off-duty, unverified agent
    pub fn new(id: impl Into<AgentId>, name: impl Into<String>, location: GeoPoint) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: AgentStatus::Offline,
            location,
            battery_level: 100,
            signal_strength: 100,
            itinerary: Vec::new(),
            is_identity_verified: false,
            last_verification_photo: None,
            metrics: PerformanceMetrics::default(),
        }
    }

    pub fn with_battery(mut self, level: u8) -> Self {
        self.battery_level = level.min(100);
        self
    }

    pub fn with_signal(mut self, strength: u8) -> Self {
        self.signal_strength = strength.min(100);
        self
    }

    pub fn with_metrics(mut self, metrics: PerformanceMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    pub fn location(&self) -> &GeoPoint {
        &self.location
    }

    pub fn battery_level(&self) -> u8 {
        self.battery_level
    }

    pub fn signal_strength(&self) -> u8 {
        self.signal_strength
    }

    pub fn itinerary(&self) -> &[MissionTask] {
        &self.itinerary
    }

    pub fn is_identity_verified(&self) -> bool {
        self.is_identity_verified
    }

    pub fn last_verification_photo(&self) -> Option<&PhotoHandle> {
        self.last_verification_photo.as_ref()
    }

    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    pub fn task(&self, task_id: &str) -> Option<&MissionTask> {
        self.itinerary.iter().find(|t| t.id == task_id)
    }

    /// The en-route or on-site task, if any
    pub fn active_task(&self) -> Option<&MissionTask> {
        self.itinerary.iter().find(|t| t.status.is_active())
    }

    pub(crate) fn set_status(&mut self, status: AgentStatus) {
        self.status = status;
    }

    pub(crate) fn move_by(&mut self, displacement: &Displacement) {
        self.location = self.location.offset(displacement);
    }

    pub(crate) fn set_battery(&mut self, level: u8) {
        self.battery_level = level.min(100);
    }

    pub(crate) fn set_signal(&mut self, strength: u8) {
        self.signal_strength = strength.min(100);
    }

    pub(crate) fn push_front(&mut self, task: MissionTask) {
        self.itinerary.insert(0, task);
    }

    pub(crate) fn take_task(&mut self, task_id: &str) -> Option<MissionTask> {
        let index = self.itinerary.iter().position(|t| t.id == task_id)?;
        Some(self.itinerary.remove(index))
    }

    pub(crate) fn task_mut(&mut self, task_id: &str) -> Option<&mut MissionTask> {
        self.itinerary.iter_mut().find(|t| t.id == task_id)
    }

    pub(crate) fn replace_itinerary(&mut self, itinerary: Vec<MissionTask>) {
        self.itinerary = itinerary;
    }

    pub(crate) fn drain_itinerary(&mut self) -> Vec<MissionTask> {
        std::mem::take(&mut self.itinerary)
    }

    pub(crate) fn record_visit(&mut self) {
        self.metrics.visits_completed += 1;
    }

    pub(crate) fn reset_verification(&mut self) {
        self.is_identity_verified = false;
        self.last_verification_photo = None;
    }

    /// Only reachable through a confirmed verification
    pub(crate) fn attach_verification(&mut self, photo: PhotoHandle) {
        self.is_identity_verified = true;
        self.last_verification_photo = Some(photo);
    }
}
