use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use super::{print_json, with_coordinator, Command, CommandContext};
use crate::shutdown::ShutdownCoordinator;
use crate::tracking::{next_frame, PositionFrame, RandomWalk};
use crate::view::Gated;

pub struct TrackCommand {
    context: CommandContext,
    ticks: u64,
}

impl TrackCommand {
    pub fn new(mut context: CommandContext, ticks: u64, interval_ms: Option<u64>) -> Self {
        if let Some(interval_ms) = interval_ms {
            context.settings.tracking.tick_interval_ms = interval_ms;
        }
        Self { context, ticks }
    }
}

fn render_frame(frame: &PositionFrame) {
    println!("⏱️  tick {} - {} agent(s)", frame.tick, frame.positions.len());
    for position in &frame.positions {
        match (&position.location, &position.status) {
            (Gated::Visible(location), Gated::Visible(status)) => println!(
                "   📍 {} {} ({:.5}, {:.5})",
                position.agent_id, status, location.lat, location.lng
            ),
            _ => println!("   🔒 {} [identity-unverified]", position.agent_id),
        }
    }
}

impl Command for TrackCommand {
    async fn execute(&self) -> Result<()> {
        let json = self.context.json;
        let ticks = self.ticks;
        let bound = self.context.settings.tracking.max_displacement_deg;
        with_coordinator(&self.context, |coordinator| async move {
            let clock = coordinator.geo_clock(Arc::new(RandomWalk::new(bound)));
            let mut frames = clock.subscribe();
            let shutdown = ShutdownCoordinator::new();
            let handle = Arc::clone(&clock).spawn(shutdown.subscribe());

            let mut seen = 0;
            while seen < ticks {
                tokio::select! {
                    frame = next_frame(&mut frames) => {
                        let Some(frame) = frame else { break };
                        seen += 1;
                        if json {
                            print_json(&frame)?;
                        } else {
                            render_frame(&frame);
                        }
                    }
                    signal = shutdown.wait_for_signal() => {
                        signal?;
                        break;
                    }
                }
            }

            shutdown.shutdown_task(handle, Duration::from_secs(5)).await?;
            coordinator.metrics().log_stats();
            Ok(())
        })
        .await
    }
}
