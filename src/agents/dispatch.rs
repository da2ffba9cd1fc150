// Dispatch Engine - moves a pooled case into an agent's itinerary

use std::sync::Arc;
use tracing::info;

use crate::agents::registry::AgentRegistry;
use crate::agents::task_pool::TaskPool;
use crate::agents::types::MissionTask;
use crate::errors::DispatchError;
use crate::events::FieldEvent;

pub struct DispatchEngine {
    registry: Arc<AgentRegistry>,
    pool: Arc<TaskPool>,
}

impl DispatchEngine {
    pub fn new(registry: Arc<AgentRegistry>, pool: Arc<TaskPool>) -> Self {
        Self { registry, pool }
    }

    /// Dispatch `case_id` to the selected agent.
    ///
    /// A missing, blank or unknown agent is `NoAgentSelected`. The new task is
    /// pending, high priority only for critical cases, and goes to the head of the
    /// itinerary. Exclusivity is decided by the registry, so of two racing
    /// dispatches of the same case exactly one wins and the other gets
    /// `AlreadyAssigned`.
    pub async fn dispatch(
        &self,
        agent_id: Option<&str>,
        case_id: &str,
    ) -> Result<MissionTask, DispatchError> {
        let agent_id = agent_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(DispatchError::NoAgentSelected)?;

        let agent = self.registry.get(agent_id).await?;
        if !agent.status().is_on_duty() {
            return Err(DispatchError::AgentOffline(agent_id.to_string()));
        }

        let case = self.pool.candidate(case_id.trim()).await?;
        let task = MissionTask::from_case(&case, self.registry.next_sequence());
        let task = self.registry.append_task(agent_id, task).await?;

        info!(
            agent_id = %agent_id,
            case_id = %task.debtor_id,
            task_id = %task.id,
            priority = %task.priority,
            "Case dispatched"
        );
        self.registry.events().publish(FieldEvent::DispatchCompleted {
            agent_id: agent_id.to_string(),
            task: task.clone(),
        });
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::task_pool::StaticPortfolio;
    use crate::agents::types::{AgentStatus, CaseRecord, FieldAgent};
    use crate::events::EventBus;
    use crate::geo::GeoPoint;
    use crate::priority::{RiskTier, TaskPriority};
    use std::collections::HashSet;

    fn case(id: &str, tier: RiskTier) -> CaseRecord {
        CaseRecord {
            id: id.to_string(),
            name: format!("Debtor {id}"),
            address: "Quezon City".to_string(),
            risk_tier: tier,
            location: None,
        }
    }

    async fn engine() -> (DispatchEngine, Arc<AgentRegistry>, Arc<TaskPool>) {
        let registry = Arc::new(AgentRegistry::new(EventBus::default(), 0.001));
        for id in ["FA-101", "FA-102", "FA-103"] {
            registry
                .register(FieldAgent::new(id, id, GeoPoint::new(14.55, 121.02)))
                .await
                .unwrap();
        }
        registry.set_status("FA-101", AgentStatus::Online).await.unwrap();
        registry.set_status("FA-102", AgentStatus::Online).await.unwrap();

        let portfolio = StaticPortfolio::new(vec![
            case("C-1", RiskTier::Critical),
            case("C-2", RiskTier::High),
            case("C-3", RiskTier::Low),
        ]);
        let pool = Arc::new(TaskPool::new(
            Arc::new(portfolio),
            vec![RiskTier::High, RiskTier::Critical],
        ));
        let engine = DispatchEngine::new(Arc::clone(&registry), Arc::clone(&pool));
        (engine, registry, pool)
    }

    #[tokio::test]
    async fn test_dispatch_creates_pending_task_at_head() {
        let (engine, registry, _) = engine().await;
        engine.dispatch(Some("FA-101"), "C-2").await.unwrap();
        let task = engine.dispatch(Some("FA-101"), "C-1").await.unwrap();

        assert_eq!(task.priority, TaskPriority::High);
        let agent = registry.get("FA-101").await.unwrap();
        assert_eq!(agent.itinerary()[0].id, task.id);
        assert_eq!(agent.itinerary()[1].priority, TaskPriority::Normal);
    }

    #[tokio::test]
    async fn test_missing_agent_is_rejected() {
        let (engine, registry, _) = engine().await;
        for target in [None, Some(""), Some("   "), Some("FA-999")] {
            assert_eq!(
                engine.dispatch(target, "C-1").await,
                Err(DispatchError::NoAgentSelected)
            );
        }
        assert!(registry.assigned_cases().is_empty());
    }

    #[tokio::test]
    async fn test_offline_agent_leaves_case_in_pool() {
        let (engine, registry, pool) = engine().await;
        assert_eq!(
            engine.dispatch(Some("FA-103"), "C-1").await,
            Err(DispatchError::AgentOffline("FA-103".into()))
        );
        let remaining = pool.snapshot(&registry.assigned_cases()).await.unwrap();
        assert!(remaining.iter().any(|c| c.id == "C-1"));
    }

    #[tokio::test]
    async fn test_second_dispatch_is_already_assigned() {
        let (engine, registry, _) = engine().await;
        let first = engine.dispatch(Some("FA-101"), "C-1").await.unwrap();
        assert_eq!(
            engine.dispatch(Some("FA-102"), "C-1").await,
            Err(DispatchError::AlreadyAssigned {
                case_id: "C-1".into(),
                owner: "FA-101".into()
            })
        );
        let owner = registry.get("FA-101").await.unwrap();
        assert_eq!(owner.itinerary(), &[first][..]);
    }

    #[tokio::test]
    async fn test_ineligible_case_is_not_found() {
        let (engine, _, _) = engine().await;
        assert_eq!(
            engine.dispatch(Some("FA-101"), "C-3").await,
            Err(DispatchError::TaskNotFound("C-3".into()))
        );
    }

    #[tokio::test]
    async fn test_case_returns_to_pool_after_terminal_state() {
        let (engine, registry, pool) = engine().await;
        let task = engine.dispatch(Some("FA-101"), "C-1").await.unwrap();
        let pooled: HashSet<String> = pool
            .snapshot(&registry.assigned_cases())
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert!(!pooled.contains("C-1"));

        registry
            .advance_task("FA-101", &task.id, crate::agent_lifecycle::MissionStatus::Failed, None)
            .await
            .unwrap();
        let pooled = pool.snapshot(&registry.assigned_cases()).await.unwrap();
        assert!(pooled.iter().any(|c| c.id == "C-1"));
    }

    #[tokio::test]
    async fn test_dispatch_publishes_completion() {
        let (engine, registry, _) = engine().await;
        let mut rx = registry.events().subscribe();
        let task = engine.dispatch(Some("FA-101"), "C-2").await.unwrap();
        match rx.recv().await.unwrap() {
            FieldEvent::DispatchCompleted { agent_id, task: sent } => {
                assert_eq!(agent_id, "FA-101");
                assert_eq!(sent.id, task.id);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
