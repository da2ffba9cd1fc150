//! Operator workflows through the DispatchCoordinator facade

mod common;

use field_dispatch::{
    AgentStatus, DispatchError, ErrorKind, FieldAgentView, FieldEvent, MissionStatus, Severity,
    TaskPriority,
};

fn pool_ids(pool: &[field_dispatch::CaseRecord]) -> Vec<String> {
    pool.iter().map(|c| c.id.clone()).collect()
}

#[tokio::test]
async fn pool_holds_only_high_risk_unassigned_cases() {
    let coordinator = common::coordinator().await;
    let ids = pool_ids(&coordinator.task_pool().await.unwrap());
    assert_eq!(ids, vec!["C-A", "C-B", "C-CRIT"]);
}

#[tokio::test]
async fn critical_case_becomes_high_priority_head_task() {
    let coordinator = common::coordinator().await;
    coordinator.dispatch(Some("FA-101"), "C-A").await.unwrap();
    let task = coordinator.dispatch(Some("FA-101"), "C-CRIT").await.unwrap();

    assert_eq!(task.status, MissionStatus::Pending);
    assert_eq!(task.priority, TaskPriority::High);

    let agent = coordinator.registry().get("FA-101").await.unwrap();
    let order: Vec<&str> = agent.itinerary().iter().map(|t| t.debtor_id.as_str()).collect();
    assert_eq!(order, vec!["C-CRIT", "C-A"]);
    assert_eq!(pool_ids(&coordinator.task_pool().await.unwrap()), vec!["C-B"]);
}

#[tokio::test]
async fn dispatch_to_offline_agent_keeps_case_pooled() {
    let coordinator = common::coordinator().await;
    let err = coordinator.dispatch(Some("FA-103"), "C-CRIT").await.unwrap_err();

    assert_eq!(err, DispatchError::AgentOffline("FA-103".into()));
    assert_eq!(err.kind(), ErrorKind::AgentOffline);
    assert!(pool_ids(&coordinator.task_pool().await.unwrap()).contains(&"C-CRIT".to_string()));
    assert!(coordinator
        .registry()
        .get("FA-103")
        .await
        .unwrap()
        .itinerary()
        .is_empty());
}

#[tokio::test]
async fn dispatch_without_agent_is_surfaced() {
    let coordinator = common::coordinator().await;
    let err = coordinator.dispatch(None, "C-A").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoAgentSelected);

    let notice = &coordinator.recent_notices()[0];
    assert_eq!(notice.severity, Severity::High);
    assert_eq!(notice.message, "dispatch failed: no agent selected for dispatch");
}

#[tokio::test]
async fn second_dispatch_of_same_case_is_already_assigned() {
    let coordinator = common::coordinator().await;
    let first = coordinator.dispatch(Some("FA-101"), "C-B").await.unwrap();

    let err = coordinator.dispatch(Some("FA-102"), "C-B").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyAssigned);

    let owner = coordinator.registry().get("FA-101").await.unwrap();
    assert_eq!(owner.itinerary(), &[first][..]);
    assert!(coordinator
        .registry()
        .get("FA-102")
        .await
        .unwrap()
        .itinerary()
        .is_empty());
}

#[tokio::test]
async fn nearer_stop_is_visited_first() {
    let coordinator = common::coordinator().await;
    coordinator.dispatch(Some("FA-101"), "C-B").await.unwrap();
    coordinator.dispatch(Some("FA-101"), "C-A").await.unwrap();

    let route = coordinator.optimize_route(Some("FA-101")).await.unwrap();
    let order: Vec<&str> = route.iter().map(|t| t.debtor_id.as_str()).collect();
    assert_eq!(order, vec!["C-B", "C-A"]);
    assert!(route.iter().all(|t| t.status == MissionStatus::Pending));
    assert!(route[0].eta_minutes <= route[1].eta_minutes);
}

#[tokio::test]
async fn optimizing_twice_gives_the_same_order() {
    let coordinator = common::coordinator().await;
    for case in ["C-A", "C-B", "C-CRIT"] {
        coordinator.dispatch(Some("FA-101"), case).await.unwrap();
    }

    let first = coordinator.optimize_route(Some("FA-101")).await.unwrap();
    let second = coordinator.optimize_route(Some("FA-101")).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn completed_task_frees_agent_and_case() {
    let coordinator = common::coordinator().await;
    let task = coordinator.dispatch(Some("FA-101"), "C-A").await.unwrap();

    coordinator
        .advance_task("FA-101", &task.id, MissionStatus::EnRoute, None)
        .await
        .unwrap();
    coordinator
        .advance_task("FA-101", &task.id, MissionStatus::OnSite, None)
        .await
        .unwrap();
    let done = coordinator
        .advance_task(
            "FA-101",
            &task.id,
            MissionStatus::Completed,
            Some("evidence/C-A.jpg".into()),
        )
        .await
        .unwrap();

    assert_eq!(done.proof_url.as_deref(), Some("evidence/C-A.jpg"));
    let agent = coordinator.registry().get("FA-101").await.unwrap();
    assert_eq!(agent.status(), AgentStatus::Online);
    assert!(agent.itinerary().is_empty());
    assert!(pool_ids(&coordinator.task_pool().await.unwrap()).contains(&"C-A".to_string()));
}

#[tokio::test]
async fn status_events_never_leak_unverified_state() {
    let coordinator = common::coordinator().await;
    let mut events = coordinator.events().subscribe();

    let task = coordinator.dispatch(Some("FA-101"), "C-A").await.unwrap();
    coordinator
        .advance_task("FA-101", &task.id, MissionStatus::EnRoute, None)
        .await
        .unwrap();

    let mut saw_status = false;
    while let Ok(event) = events.try_recv() {
        if let FieldEvent::AgentStatusChanged { status, .. } = event {
            assert!(status.is_locked());
            saw_status = true;
        }
    }
    assert!(saw_status);
}

#[tokio::test]
async fn operator_override_moves_agent_backwards() {
    let coordinator = common::coordinator().await;
    let err = coordinator
        .set_status("FA-103", AgentStatus::OnSite)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    assert_eq!(
        coordinator
            .override_status("FA-101", AgentStatus::Offline)
            .await
            .unwrap(),
        AgentStatus::Offline
    );
    let err = coordinator.dispatch(Some("FA-101"), "C-A").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AgentOffline);
}

#[tokio::test]
async fn views_serialize_without_live_fields_when_locked() {
    let coordinator = common::coordinator().await;
    let views = coordinator.list_agents().await;
    assert_eq!(views.len(), 3);
    for view in &views {
        assert!(matches!(view, FieldAgentView::Locked(_)));
        let json = serde_json::to_value(view).unwrap();
        assert!(json.get("location").is_none());
        assert!(json.get("status").is_none());
        assert!(json.get("batteryLevel").is_none());
    }
}
