// Task Pool - the set of eligible cases not owned by any itinerary.
// Nothing is stored here; the pool is recomputed from the case feed on every query.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::agents::types::{CaseId, CaseRecord};
use crate::errors::DispatchError;
use crate::priority::RiskTier;

/// Read-only feed of case records from the case-management system
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaseFeed: Send + Sync {
    async fn cases(&self) -> anyhow::Result<Vec<CaseRecord>>;
}

/// Fixed portfolio loaded at shift start
#[derive(Debug, Clone, Default)]
pub struct StaticPortfolio {
    cases: Vec<CaseRecord>,
}

impl StaticPortfolio {
    pub fn new(cases: Vec<CaseRecord>) -> Self {
        Self { cases }
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

#[async_trait]
impl CaseFeed for StaticPortfolio {
    async fn cases(&self) -> anyhow::Result<Vec<CaseRecord>> {
        Ok(self.cases.clone())
    }
}

/// Eligible cases minus the ones already assigned, in feed order
pub fn compute_pool(
    cases: Vec<CaseRecord>,
    eligible_tiers: &[RiskTier],
    assigned: &HashSet<CaseId>,
) -> Vec<CaseRecord> {
    cases
        .into_iter()
        .filter(|case| eligible_tiers.contains(&case.risk_tier))
        .filter(|case| !assigned.contains(&case.id))
        .collect()
}

pub struct TaskPool {
    feed: Arc<dyn CaseFeed>,
    eligible_tiers: Vec<RiskTier>,
}

impl TaskPool {
    pub fn new(feed: Arc<dyn CaseFeed>, eligible_tiers: Vec<RiskTier>) -> Self {
        Self {
            feed,
            eligible_tiers,
        }
    }

    pub fn eligible_tiers(&self) -> &[RiskTier] {
        &self.eligible_tiers
    }

    async fn fetch(&self) -> Result<Vec<CaseRecord>, DispatchError> {
        self.feed
            .cases()
            .await
            .map_err(|e| DispatchError::PortfolioUnavailable(e.to_string()))
    }

    /// Current pool given the cases owned by itineraries
    pub async fn snapshot(&self, assigned: &HashSet<CaseId>) -> Result<Vec<CaseRecord>, DispatchError> {
        let cases = self.fetch().await?;
        let total = cases.len();
        let pool = compute_pool(cases, &self.eligible_tiers, assigned);
        debug!(portfolio = total, pooled = pool.len(), "Task pool recomputed");
        Ok(pool)
    }

    /// Look up an eligible case regardless of ownership.
    /// Ownership is settled by the registry at append time.
    pub async fn candidate(&self, case_id: &str) -> Result<CaseRecord, DispatchError> {
        self.fetch()
            .await?
            .into_iter()
            .find(|case| case.id == case_id && self.eligible_tiers.contains(&case.risk_tier))
            .ok_or_else(|| DispatchError::TaskNotFound(case_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;

    fn case(id: &str, tier: RiskTier) -> CaseRecord {
        CaseRecord {
            id: id.to_string(),
            name: format!("Debtor {id}"),
            address: "Pasig".to_string(),
            risk_tier: tier,
            location: Some(GeoPoint::new(14.57, 121.06)),
        }
    }

    fn portfolio() -> Vec<CaseRecord> {
        vec![
            case("C-1", RiskTier::Critical),
            case("C-2", RiskTier::Low),
            case("C-3", RiskTier::High),
            case("C-4", RiskTier::Medium),
        ]
    }

    fn eligible() -> Vec<RiskTier> {
        vec![RiskTier::High, RiskTier::Critical]
    }

    #[test]
    fn test_pool_filters_tiers_and_assignments() {
        let assigned: HashSet<CaseId> = ["C-3".to_string()].into_iter().collect();
        let pool = compute_pool(portfolio(), &eligible(), &assigned);
        let ids: Vec<&str> = pool.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["C-1"]);
    }

    #[test]
    fn test_pool_is_idempotent() {
        let assigned = HashSet::new();
        let first = compute_pool(portfolio(), &eligible(), &assigned);
        let second = compute_pool(portfolio(), &eligible(), &assigned);
        assert_eq!(first, second);
    }

    #[test]
    fn test_static_portfolio_serves_every_case() {
        let portfolio = StaticPortfolio::new(portfolio());
        assert_eq!(portfolio.len(), 4);
        tokio_test::block_on(async {
            let cases = portfolio.cases().await.unwrap();
            assert_eq!(cases.len(), 4);
            assert_eq!(cases[0].id, "C-1");
        });
    }

    #[tokio::test]
    async fn test_candidate_rejects_ineligible_case() {
        let pool = TaskPool::new(Arc::new(StaticPortfolio::new(portfolio())), eligible());
        assert_eq!(pool.candidate("C-1").await.unwrap().id, "C-1");
        assert_eq!(
            pool.candidate("C-2").await,
            Err(DispatchError::TaskNotFound("C-2".into()))
        );
        assert_eq!(
            pool.candidate("C-404").await,
            Err(DispatchError::TaskNotFound("C-404".into()))
        );
    }

    #[tokio::test]
    async fn test_feed_failure_is_surfaced() {
        let mut feed = MockCaseFeed::new();
        feed.expect_cases()
            .times(1)
            .returning(|| Err(anyhow::anyhow!("portfolio export timed out")));

        let pool = TaskPool::new(Arc::new(feed), eligible());
        let err = pool.snapshot(&HashSet::new()).await.unwrap_err();
        assert_eq!(
            err,
            DispatchError::PortfolioUnavailable("portfolio export timed out".into())
        );
    }

    #[tokio::test]
    async fn test_pool_reads_feed_on_every_query() {
        let mut feed = MockCaseFeed::new();
        feed.expect_cases()
            .times(2)
            .returning(|| Ok(vec![case("C-1", RiskTier::Critical)]));

        let pool = TaskPool::new(Arc::new(feed), eligible());
        assert_eq!(pool.snapshot(&HashSet::new()).await.unwrap().len(), 1);
        let assigned: HashSet<CaseId> = ["C-1".to_string()].into_iter().collect();
        assert!(pool.snapshot(&assigned).await.unwrap().is_empty());
    }
}
