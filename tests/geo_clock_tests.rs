//! Live tracking frames driven by the geo clock

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use field_dispatch::tracking::next_frame;
use field_dispatch::{
    AgentStatus, Gated, GeoPoint, PositionSource, ShutdownCoordinator, TelemetryError,
    TelemetrySample,
};

/// Moves every agent north by a fixed step and counts samples taken
struct NorthwardDrift {
    step: f64,
    samples: AtomicUsize,
}

impl NorthwardDrift {
    fn new(step: f64) -> Self {
        Self {
            step,
            samples: AtomicUsize::new(0),
        }
    }
}

impl PositionSource for NorthwardDrift {
    fn sample(&self, agent_id: &str) -> Result<TelemetrySample, TelemetryError> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        if agent_id == "FA-102" {
            return Err(TelemetryError::NoSignal(agent_id.to_string()));
        }
        Ok(TelemetrySample::moved(self.step, 0.0))
    }
}

#[tokio::test]
async fn tick_moves_on_duty_agents_only() {
    let coordinator = common::coordinator().await;
    let source = Arc::new(NorthwardDrift::new(0.0005));
    let clock = coordinator.geo_clock(source.clone());

    let frame = clock.tick_once().await;
    assert_eq!(frame.tick, 1);
    // FA-103 is off duty and never sampled
    assert_eq!(source.samples.load(Ordering::SeqCst), 2);

    // every registered agent is listed, on duty or not
    let mut ids: Vec<&str> = frame.positions.iter().map(|p| p.agent_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["FA-101", "FA-102", "FA-103"]);
    assert!(frame.positions.iter().all(|p| p.location.is_locked()));
    assert!(frame.positions.iter().all(|p| p.status.is_locked()));

    let moved = coordinator.registry().get("FA-101").await.unwrap();
    assert!((moved.location().lat - 14.5552).abs() < 1e-9);
    let stuck = coordinator.registry().get("FA-102").await.unwrap();
    assert_eq!(stuck.location(), &GeoPoint::new(14.5764, 121.0851).with_label("Ortigas"));

    let stats = coordinator.metrics().get_stats();
    assert_eq!(stats.ticks, 1);
    assert_eq!(stats.dropped_updates, 1);
}

#[tokio::test]
async fn oversized_step_is_dropped_not_applied() {
    let coordinator = common::coordinator().await;
    let clock = coordinator.geo_clock(Arc::new(NorthwardDrift::new(0.5)));

    clock.tick_once().await;
    let agent = coordinator.registry().get("FA-101").await.unwrap();
    assert!((agent.location().lat - 14.5547).abs() < 1e-9);
    assert_eq!(coordinator.metrics().get_stats().dropped_updates, 2);
}

#[tokio::test]
async fn verified_agent_position_is_visible_in_frames() {
    let coordinator = common::coordinator().await;
    coordinator.begin_verification("FA-101").await.unwrap();
    let photo = coordinator.capture_verification("FA-101").await.unwrap();
    coordinator
        .confirm_verification("FA-101", &photo)
        .await
        .unwrap();

    let clock = coordinator.geo_clock(Arc::new(NorthwardDrift::new(0.0)));
    let frame = clock.tick_once().await;
    let fa101 = frame
        .positions
        .iter()
        .find(|p| p.agent_id == "FA-101")
        .unwrap();
    assert_eq!(fa101.status, Gated::Visible(AgentStatus::Online));
    assert!(fa101.location.visible().is_some());
}

#[tokio::test]
async fn unverified_off_duty_agent_is_listed_but_locked() {
    let coordinator = common::coordinator().await;
    let clock = coordinator.geo_clock(Arc::new(NorthwardDrift::new(0.0)));

    let frame = clock.tick_once().await;
    assert_eq!(frame.positions.len(), coordinator.registry().list().await.len());
    let fa103 = frame
        .positions
        .iter()
        .find(|p| p.agent_id == "FA-103")
        .unwrap();
    assert!(fa103.status.is_locked());
    assert!(fa103.location.is_locked());
}

#[tokio::test(start_paused = true)]
async fn running_clock_broadcasts_until_shutdown() {
    let coordinator = common::coordinator().await;
    let clock = coordinator.geo_clock(Arc::new(NorthwardDrift::new(0.0001)));
    let mut frames = clock.subscribe();

    let shutdown = ShutdownCoordinator::new();
    let handle = Arc::clone(&clock).spawn(shutdown.subscribe());

    let first = next_frame(&mut frames).await.unwrap();
    let second = next_frame(&mut frames).await.unwrap();
    assert_eq!(first.tick, 1);
    assert_eq!(second.tick, 2);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("clock stops after shutdown")
        .unwrap();
    assert!(clock.ticks() >= 2);
}
