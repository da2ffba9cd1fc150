use serde::Serialize;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

use super::notices::{Notice, NoticeBoard, Severity};
use crate::agent_lifecycle::MissionStatus;
use crate::agents::types::{AgentStatus, MissionTask};
use crate::geo::GeoPoint;
use crate::view::Gated;

const DEFAULT_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(6);
const DEFAULT_NOTICE_CAPACITY: u64 = 64;

/// Push events exposed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum FieldEvent {
    #[serde(rename_all = "camelCase")]
    AgentStatusChanged {
        agent_id: String,
        status: Gated<AgentStatus>,
    },
    #[serde(rename_all = "camelCase")]
    AgentLocationChanged {
        agent_id: String,
        location: Gated<GeoPoint>,
    },
    #[serde(rename_all = "camelCase")]
    TaskStatusChanged {
        agent_id: String,
        task_id: String,
        case_id: String,
        status: Gated<MissionStatus>,
    },
    #[serde(rename_all = "camelCase")]
    DispatchCompleted { agent_id: String, task: MissionTask },
    #[serde(rename_all = "camelCase")]
    RouteOptimized {
        agent_id: String,
        order: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    VerificationConfirmed { agent_id: String },
}

impl FieldEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FieldEvent::AgentStatusChanged { .. } => "agentStatusChanged",
            FieldEvent::AgentLocationChanged { .. } => "agentLocationChanged",
            FieldEvent::TaskStatusChanged { .. } => "taskStatusChanged",
            FieldEvent::DispatchCompleted { .. } => "dispatchCompleted",
            FieldEvent::RouteOptimized { .. } => "routeOptimized",
            FieldEvent::VerificationConfirmed { .. } => "verificationConfirmed",
        }
    }

    /// Status and location traffic is audit-level
    pub fn severity(&self) -> Severity {
        match self {
            FieldEvent::AgentStatusChanged { .. }
            | FieldEvent::AgentLocationChanged { .. }
            | FieldEvent::TaskStatusChanged { .. } => Severity::Low,
            FieldEvent::DispatchCompleted { .. }
            | FieldEvent::RouteOptimized { .. }
            | FieldEvent::VerificationConfirmed { .. } => Severity::Normal,
        }
    }

    pub fn agent_id(&self) -> &str {
        match self {
            FieldEvent::AgentStatusChanged { agent_id, .. }
            | FieldEvent::AgentLocationChanged { agent_id, .. }
            | FieldEvent::TaskStatusChanged { agent_id, .. }
            | FieldEvent::DispatchCompleted { agent_id, .. }
            | FieldEvent::RouteOptimized { agent_id, .. }
            | FieldEvent::VerificationConfirmed { agent_id } => agent_id,
        }
    }
}

/// Fan-out of field events plus the operator notice board.
/// Publishing never waits on subscribers; a lagging subscriber skips ahead.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<FieldEvent>,
    notices: NoticeBoard,
}

impl EventBus {
    pub fn new(capacity: usize, notice_ttl: Duration, notice_capacity: u64) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            notices: NoticeBoard::new(notice_ttl, notice_capacity),
        }
    }

    pub fn publish(&self, event: FieldEvent) {
        debug!(
            event = event.name(),
            agent_id = %event.agent_id(),
            severity = %event.severity(),
            "Publishing field event"
        );
        // No subscribers is fine, the event is simply dropped
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FieldEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub async fn notify(
        &self,
        severity: Severity,
        operation: &str,
        message: impl Into<String>,
    ) -> Notice {
        self.notices.raise(severity, operation, message).await
    }

    /// Surface a failed operator action
    pub async fn notify_failure(&self, operation: &str, reason: &impl std::fmt::Display) -> Notice {
        tracing::warn!(operation = operation, reason = %reason, "Operation failed");
        self.notices
            .raise(Severity::High, operation, format!("{operation} failed: {reason}"))
            .await
    }

    pub fn recent_notices(&self) -> Vec<Notice> {
        self.notices.recent()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(
            DEFAULT_CHANNEL_CAPACITY,
            DEFAULT_NOTICE_TTL,
            DEFAULT_NOTICE_CAPACITY,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::RecvError;

    fn status_event(agent: &str) -> FieldEvent {
        FieldEvent::AgentStatusChanged {
            agent_id: agent.to_string(),
            status: Gated::Visible(AgentStatus::Online),
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.publish(status_event("FA-101"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "agentStatusChanged");
        assert_eq!(event.agent_id(), "FA-101");
        assert_eq!(event.severity(), Severity::Low);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_harmless() {
        let bus = EventBus::default();
        bus.publish(status_event("FA-101"));
        assert_eq!(bus.receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags_instead_of_blocking() {
        let bus = EventBus::new(2, Duration::from_secs(5), 8);
        let mut rx = bus.subscribe();
        for i in 0..5 {
            bus.publish(status_event(&format!("FA-{i}")));
        }
        match rx.recv().await {
            Err(RecvError::Lagged(skipped)) => assert_eq!(skipped, 3),
            other => panic!("expected lag, got {other:?}"),
        }
        assert_eq!(rx.recv().await.unwrap().agent_id(), "FA-3");
    }

    #[tokio::test]
    async fn test_failure_notice_names_operation() {
        let bus = EventBus::default();
        let notice = bus.notify_failure("dispatch", &"agent FA-102 is offline").await;
        assert_eq!(notice.severity, Severity::High);
        assert_eq!(notice.message, "dispatch failed: agent FA-102 is offline");
        assert_eq!(bus.recent_notices().len(), 1);
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_value(FieldEvent::VerificationConfirmed {
            agent_id: "FA-101".into(),
        })
        .unwrap();
        assert_eq!(json["event"], "verificationConfirmed");
        assert_eq!(json["agentId"], "FA-101");
    }
}
