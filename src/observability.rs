use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// Counters for operator actions and the tracking loop
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    pub dispatches: AtomicU64,
    pub rejected_dispatches: AtomicU64,
    pub optimizations: AtomicU64,
    pub verifications: AtomicU64,
    pub failed_verifications: AtomicU64,
    pub ticks: AtomicU64,
    pub dropped_updates: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dispatch(&self) {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_dispatch(&self) {
        self.rejected_dispatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_optimization(&self) {
        self.optimizations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_verification(&self) {
        self.verifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_verification(&self) {
        self.failed_verifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_update(&self, agent_id: &str, reason: &str) {
        self.dropped_updates.fetch_add(1, Ordering::Relaxed);
        warn!(agent_id = %agent_id, reason = %reason, "Location update dropped");
    }

    pub fn get_stats(&self) -> DispatchStats {
        DispatchStats {
            dispatches: self.dispatches.load(Ordering::Relaxed),
            rejected_dispatches: self.rejected_dispatches.load(Ordering::Relaxed),
            optimizations: self.optimizations.load(Ordering::Relaxed),
            verifications: self.verifications.load(Ordering::Relaxed),
            failed_verifications: self.failed_verifications.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
            dropped_updates: self.dropped_updates.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Dispatch metrics: dispatches={}, rejected={}, optimizations={}, verifications={}, failed_verifications={}, ticks={}, dropped_updates={}",
            stats.dispatches,
            stats.rejected_dispatches,
            stats.optimizations,
            stats.verifications,
            stats.failed_verifications,
            stats.ticks,
            stats.dropped_updates
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchStats {
    pub dispatches: u64,
    pub rejected_dispatches: u64,
    pub optimizations: u64,
    pub verifications: u64,
    pub failed_verifications: u64,
    pub ticks: u64,
    pub dropped_updates: u64,
}

/// Time an operation and log its duration
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = DispatchMetrics::new();
        metrics.record_dispatch();
        metrics.record_dispatch();
        metrics.record_rejected_dispatch();
        metrics.record_tick();
        metrics.record_dropped_update("FA-101", "displacement out of bounds");

        let stats = metrics.get_stats();
        assert_eq!(stats.dispatches, 2);
        assert_eq!(stats.rejected_dispatches, 1);
        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.dropped_updates, 1);
        assert_eq!(stats.optimizations, 0);
    }
}
