use serde::{Deserialize, Serialize};
use std::fmt;

use super::state_machine::DutyEvent;

/// Lifecycle of a mission task.
/// `Completed` and `Failed` are terminal; a terminal task never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissionStatus {
    Pending,
    EnRoute,
    OnSite,
    Completed,
    Failed,
}

impl MissionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, MissionStatus::Completed | MissionStatus::Failed)
    }

    /// En-route and on-site tasks hold the agent on duty
    pub fn is_active(self) -> bool {
        matches!(self, MissionStatus::EnRoute | MissionStatus::OnSite)
    }

    pub fn can_advance_to(self, next: MissionStatus) -> bool {
        match (self, next) {
            (MissionStatus::Pending, MissionStatus::EnRoute)
            | (MissionStatus::EnRoute, MissionStatus::OnSite)
            | (MissionStatus::OnSite, MissionStatus::Completed) => true,
            (current, MissionStatus::Failed) => !current.is_terminal(),
            _ => false,
        }
    }

    /// Duty event the owning agent goes through when a task moves from `self` to `next`
    pub fn duty_event(self, next: MissionStatus) -> Option<DutyEvent> {
        match next {
            MissionStatus::EnRoute => Some(DutyEvent::Depart),
            MissionStatus::OnSite => Some(DutyEvent::Arrive),
            MissionStatus::Completed | MissionStatus::Failed if self.is_active() => {
                Some(DutyEvent::Release)
            }
            _ => None,
        }
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MissionStatus::Pending => "pending",
            MissionStatus::EnRoute => "en-route",
            MissionStatus::OnSite => "on-site",
            MissionStatus::Completed => "completed",
            MissionStatus::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(MissionStatus::Pending.can_advance_to(MissionStatus::EnRoute));
        assert!(MissionStatus::EnRoute.can_advance_to(MissionStatus::OnSite));
        assert!(MissionStatus::OnSite.can_advance_to(MissionStatus::Completed));
    }

    #[test]
    fn test_failure_from_any_open_state() {
        assert!(MissionStatus::Pending.can_advance_to(MissionStatus::Failed));
        assert!(MissionStatus::EnRoute.can_advance_to(MissionStatus::Failed));
        assert!(MissionStatus::OnSite.can_advance_to(MissionStatus::Failed));
    }

    #[test]
    fn test_no_skips_or_backward_moves() {
        assert!(!MissionStatus::Pending.can_advance_to(MissionStatus::OnSite));
        assert!(!MissionStatus::Pending.can_advance_to(MissionStatus::Completed));
        assert!(!MissionStatus::OnSite.can_advance_to(MissionStatus::EnRoute));
        assert!(!MissionStatus::Completed.can_advance_to(MissionStatus::Failed));
        assert!(!MissionStatus::Failed.can_advance_to(MissionStatus::Pending));
    }

    #[test]
    fn test_duty_events() {
        assert_eq!(
            MissionStatus::Pending.duty_event(MissionStatus::EnRoute),
            Some(DutyEvent::Depart)
        );
        assert_eq!(
            MissionStatus::OnSite.duty_event(MissionStatus::Completed),
            Some(DutyEvent::Release)
        );
        // A pending task failing never held the agent
        assert_eq!(MissionStatus::Pending.duty_event(MissionStatus::Failed), None);
    }

    #[test]
    fn test_display_matches_wire_names() {
        assert_eq!(MissionStatus::EnRoute.to_string(), "en-route");
        assert_eq!(
            serde_json::to_string(&MissionStatus::OnSite).unwrap(),
            "\"on-site\""
        );
    }
}
