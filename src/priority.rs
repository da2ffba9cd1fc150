use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk tier reported by the case-management feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    /// Parse the tier labels used by the portfolio export
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Some(RiskTier::Low),
            "medium" => Some(RiskTier::Medium),
            "high" => Some(RiskTier::High),
            "critical" => Some(RiskTier::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
            RiskTier::Critical => "Critical",
        };
        write!(f, "{}", label)
    }
}

/// Priority of a mission task inside an itinerary.
/// Higher values sort first when breaking route ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Normal = 0,
    High = 1,
}

impl TaskPriority {
    /// Only critical cases are dispatched as high priority
    pub fn from_risk_tier(tier: RiskTier) -> Self {
        match tier {
            RiskTier::Critical => TaskPriority::High,
            _ => TaskPriority::Normal,
        }
    }

    pub fn value(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskPriority::High => "HIGH",
            TaskPriority::Normal => "NORMAL",
        };
        write!(f, "{}", label)
    }
}
