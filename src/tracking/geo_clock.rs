// Geo Clock - fixed-interval location ticks for on-duty agents
//
// Each tick samples the position source for every on-duty agent, applies the
// readings through the registry and broadcasts one frame listing every
// registered agent, gated on identity. Frames go out on a
// bounded broadcast channel: a slow subscriber loses old frames instead of
// holding up the loop. A bad reading for one agent is logged and skipped.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::source::PositionSource;
use crate::agents::registry::AgentRegistry;
use crate::agents::types::AgentStatus;
use crate::geo::GeoPoint;
use crate::observability::DispatchMetrics;
use crate::shutdown::wait_for_shutdown;
use crate::view::Gated;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPosition {
    pub agent_id: String,
    pub location: Gated<GeoPoint>,
    pub status: Gated<AgentStatus>,
}

/// Snapshot of every registered agent after one tick.
/// Off-duty agents are listed too so membership says nothing about status.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionFrame {
    pub tick: u64,
    pub positions: Vec<AgentPosition>,
}

pub struct GeoClock {
    registry: Arc<AgentRegistry>,
    source: Arc<dyn PositionSource>,
    frames: broadcast::Sender<PositionFrame>,
    period: Duration,
    ticks: AtomicU64,
    metrics: Arc<DispatchMetrics>,
}

impl GeoClock {
    pub fn new(
        registry: Arc<AgentRegistry>,
        source: Arc<dyn PositionSource>,
        period: Duration,
        frame_buffer: usize,
        metrics: Arc<DispatchMetrics>,
    ) -> Self {
        let (frames, _) = broadcast::channel(frame_buffer.max(1));
        Self {
            registry,
            source,
            frames,
            period,
            ticks: AtomicU64::new(0),
            metrics,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PositionFrame> {
        self.frames.subscribe()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Run one tick and return the frame it broadcast
    pub async fn tick_once(&self) -> PositionFrame {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;

        for agent_id in self.registry.on_duty_ids().await {
            let sample = match self.source.sample(&agent_id) {
                Ok(sample) => sample,
                Err(e) => {
                    self.metrics.record_dropped_update(&agent_id, &e.to_string());
                    continue;
                }
            };
            if let Err(e) = self
                .registry
                .record_telemetry(
                    &agent_id,
                    sample.displacement,
                    sample.battery_level,
                    sample.signal_strength,
                )
                .await
            {
                self.metrics.record_dropped_update(&agent_id, &e.to_string());
            }
        }

        let positions = self
            .registry
            .list()
            .await
            .into_iter()
            .map(|agent| {
                let verified = agent.is_identity_verified();
                AgentPosition {
                    agent_id: agent.id().to_string(),
                    location: Gated::gate(verified, agent.location().clone()),
                    status: Gated::gate(verified, agent.status()),
                }
            })
            .collect();
        let frame = PositionFrame { tick, positions };

        self.metrics.record_tick();
        // Nobody listening is fine
        let receivers = self.frames.send(frame.clone()).unwrap_or(0);
        debug!(tick, agents = frame.positions.len(), receivers, "Position frame broadcast");
        frame
    }

    /// Tick until shutdown. Late ticks are skipped, never bunched up.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick of an interval fires immediately
        ticker.tick().await;
        info!(period_ms = self.period.as_millis() as u64, "Geo clock started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick_once().await;
                }
                _ = wait_for_shutdown(&mut shutdown) => {
                    break;
                }
            }
        }
        info!(ticks = self.ticks(), "Geo clock stopped");
    }

    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

/// Next frame for a subscriber, skipping frames it was too slow to see.
/// `None` once the clock is gone.
pub async fn next_frame(frames: &mut broadcast::Receiver<PositionFrame>) -> Option<PositionFrame> {
    loop {
        match frames.recv().await {
            Ok(frame) => return Some(frame),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Subscriber fell behind; dropping stale frames");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::types::FieldAgent;
    use crate::errors::TelemetryError;
    use crate::events::EventBus;
    use crate::tracking::source::{MockPositionSource, RandomWalk, TelemetrySample};
    use crate::verification::PhotoHandle;
    use mockall::predicate::eq;

    async fn registry_with(agents: &[(&str, AgentStatus)]) -> Arc<AgentRegistry> {
        let registry = Arc::new(AgentRegistry::new(EventBus::default(), 0.001));
        for (id, status) in agents {
            registry
                .register(FieldAgent::new(*id, *id, GeoPoint::new(14.5547, 121.0244)))
                .await
                .unwrap();
            if *status != AgentStatus::Offline {
                registry.set_status(id, AgentStatus::Online).await.unwrap();
            }
        }
        registry
    }

    fn clock(registry: Arc<AgentRegistry>, source: Arc<dyn PositionSource>) -> GeoClock {
        GeoClock::new(
            registry,
            source,
            Duration::from_millis(3000),
            4,
            Arc::new(DispatchMetrics::new()),
        )
    }

    #[tokio::test]
    async fn test_tick_moves_only_on_duty_agents() {
        let registry =
            registry_with(&[("FA-101", AgentStatus::Online), ("FA-102", AgentStatus::Offline)]).await;
        let clock = clock(Arc::clone(&registry), Arc::new(RandomWalk::new(0.001)));

        let origin = GeoPoint::new(14.5547, 121.0244);
        for _ in 0..20 {
            let before = registry.get("FA-101").await.unwrap().location().clone();
            clock.tick_once().await;
            let after = registry.get("FA-101").await.unwrap().location().clone();
            assert!((after.lat - before.lat).abs() <= 0.001 + 1e-12);
            assert!((after.lng - before.lng).abs() <= 0.001 + 1e-12);
        }
        assert_eq!(registry.get("FA-102").await.unwrap().location(), &origin);
    }

    #[tokio::test]
    async fn test_bad_sample_does_not_stop_other_agents() {
        let registry =
            registry_with(&[("FA-101", AgentStatus::Online), ("FA-102", AgentStatus::Online)]).await;
        let mut source = MockPositionSource::new();
        source
            .expect_sample()
            .with(eq("FA-101"))
            .returning(|_| Ok(TelemetrySample::moved(5.0, 0.0)));
        source
            .expect_sample()
            .with(eq("FA-102"))
            .returning(|_| Ok(TelemetrySample::moved(0.0005, 0.0)));

        let metrics = Arc::new(DispatchMetrics::new());
        let clock = GeoClock::new(
            Arc::clone(&registry),
            Arc::new(source),
            Duration::from_secs(3),
            4,
            Arc::clone(&metrics),
        );
        clock.tick_once().await;

        assert_eq!(registry.get("FA-101").await.unwrap().location().lat, 14.5547);
        assert!((registry.get("FA-102").await.unwrap().location().lat - 14.5552).abs() < 1e-9);
        assert_eq!(metrics.get_stats().dropped_updates, 1);
        assert_eq!(metrics.get_stats().ticks, 1);
    }

    #[tokio::test]
    async fn test_source_error_is_swallowed() {
        let registry = registry_with(&[("FA-101", AgentStatus::Online)]).await;
        let mut source = MockPositionSource::new();
        source
            .expect_sample()
            .returning(|id| Err(TelemetryError::NoSignal(id.to_string())));

        let clock = clock(Arc::clone(&registry), Arc::new(source));
        let frame = clock.tick_once().await;
        assert_eq!(frame.tick, 1);
        assert_eq!(frame.positions.len(), 1);
    }

    #[tokio::test]
    async fn test_frames_hide_unverified_agents() {
        let registry =
            registry_with(&[("FA-101", AgentStatus::Online), ("FA-102", AgentStatus::Online)]).await;
        registry
            .confirm_identity("FA-102", PhotoHandle::new("photo-1"))
            .await
            .unwrap();
        let clock = clock(Arc::clone(&registry), Arc::new(RandomWalk::new(0.0)));

        let frame = clock.tick_once().await;
        let by_id = |id: &str| frame.positions.iter().find(|p| p.agent_id == id).cloned();
        assert!(by_id("FA-101").unwrap().location.is_locked());
        assert_eq!(
            by_id("FA-102").unwrap().status,
            Gated::Visible(AgentStatus::Online)
        );
    }

    #[tokio::test]
    async fn test_frames_list_off_duty_agents_as_locked() {
        let registry =
            registry_with(&[("FA-101", AgentStatus::Online), ("FA-102", AgentStatus::Offline)]).await;
        let clock = clock(Arc::clone(&registry), Arc::new(RandomWalk::new(0.0)));

        let frame = clock.tick_once().await;
        let mut ids: Vec<&str> = frame.positions.iter().map(|p| p.agent_id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["FA-101", "FA-102"]);
        let off_duty = frame.positions.iter().find(|p| p.agent_id == "FA-102").unwrap();
        assert!(off_duty.status.is_locked());
        assert!(off_duty.location.is_locked());
    }

    #[tokio::test]
    async fn test_slow_subscriber_skips_frames() {
        let registry = registry_with(&[("FA-101", AgentStatus::Online)]).await;
        let clock = clock(Arc::clone(&registry), Arc::new(RandomWalk::new(0.0)));
        let mut rx = clock.subscribe();

        for _ in 0..10 {
            clock.tick_once().await;
        }
        // buffer of 4 keeps only the newest frames
        let frame = next_frame(&mut rx).await.unwrap();
        assert_eq!(frame.tick, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_until_shutdown() {
        let registry = registry_with(&[("FA-101", AgentStatus::Online)]).await;
        let clock = Arc::new(clock(Arc::clone(&registry), Arc::new(RandomWalk::new(0.001))));
        let mut rx = clock.subscribe();
        let (stop, shutdown) = watch::channel(false);

        let handle = Arc::clone(&clock).spawn(shutdown);
        assert_eq!(next_frame(&mut rx).await.unwrap().tick, 1);
        assert_eq!(next_frame(&mut rx).await.unwrap().tick, 2);

        stop.send_replace(true);
        handle.await.unwrap();
        assert!(clock.ticks() >= 2);
    }
}
