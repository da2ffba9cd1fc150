// Shift Roster - the agents on shift and the case portfolio they work from
//
// ```toml
// [[agents]]
// id = "FA-101"
// name = "Ramon Reyes"
// status = "online"
// location = { lat = 14.5547, lng = 121.0244, label = "Makati CBD" }
// itinerary = ["C-2001"]
//
// [[cases]]
// id = "C-2001"
// name = "Dela Cruz Trading"
// address = "12 Ayala Ave, Makati"
// riskTier = "Critical"
// location = { lat = 14.5570, lng = 121.0260 }
// ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::agents::task_pool::StaticPortfolio;
use crate::agents::types::{AgentId, AgentStatus, CaseId, CaseRecord, FieldAgent, PerformanceMetrics};
use crate::geo::GeoPoint;

fn full() -> u8 {
    100
}

/// One agent at shift start. Identity verification is never imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSeed {
    pub id: AgentId,
    pub name: String,
    #[serde(default)]
    pub status: AgentStatus,
    pub location: GeoPoint,
    #[serde(default = "full")]
    pub battery_level: u8,
    #[serde(default = "full")]
    pub signal_strength: u8,
    #[serde(default)]
    pub metrics: PerformanceMetrics,
    /// Case ids already assigned, first stop first
    #[serde(default)]
    pub itinerary: Vec<CaseId>,
}

impl AgentSeed {
    pub fn to_agent(&self) -> FieldAgent {
        FieldAgent::new(self.id.clone(), self.name.clone(), self.location.clone())
            .with_battery(self.battery_level)
            .with_signal(self.signal_strength)
            .with_metrics(self.metrics.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShiftManifest {
    #[serde(default)]
    pub agents: Vec<AgentSeed>,
    #[serde(default)]
    pub cases: Vec<CaseRecord>,
}

impl ShiftManifest {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read shift manifest {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Invalid shift manifest {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let manifest: ShiftManifest = toml::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Ids must be unique, itineraries may only name known cases, and no case
    /// may sit in two itineraries.
    pub fn validate(&self) -> Result<()> {
        let mut agent_ids = HashSet::new();
        for agent in &self.agents {
            if !agent_ids.insert(agent.id.as_str()) {
                anyhow::bail!("agent {} is listed twice", agent.id);
            }
            if !agent.location.is_valid() {
                anyhow::bail!("agent {} has an invalid location", agent.id);
            }
        }

        let mut case_ids = HashSet::new();
        for case in &self.cases {
            if !case_ids.insert(case.id.as_str()) {
                anyhow::bail!("case {} is listed twice", case.id);
            }
        }

        let mut owners: HashMap<&str, &str> = HashMap::new();
        for agent in &self.agents {
            for case_id in &agent.itinerary {
                if !case_ids.contains(case_id.as_str()) {
                    anyhow::bail!("agent {} references unknown case {}", agent.id, case_id);
                }
                if let Some(owner) = owners.insert(case_id.as_str(), agent.id.as_str()) {
                    anyhow::bail!(
                        "case {} is assigned to both {} and {}",
                        case_id,
                        owner,
                        agent.id
                    );
                }
            }
        }
        Ok(())
    }

    pub fn case(&self, case_id: &str) -> Option<&CaseRecord> {
        self.cases.iter().find(|c| c.id == case_id)
    }

    pub fn portfolio(&self) -> StaticPortfolio {
        StaticPortfolio::new(self.cases.clone())
    }
}
