// Route Optimizer - nearest-neighbour visit ordering
//
// Greedy nearest-neighbour ordering of an agent's itinerary. Starting from the
// agent's position, the closest unvisited geocoded task is taken next and the
// cursor moves to it. Near ties go to the higher priority, then to the earlier
// dispatch. Tasks already under way stay pinned at the head, and tasks without a
// geocode are appended last in dispatch order.
//
// The plan depends only on the position and the set of tasks, never on their
// current order, so re-running it on an unchanged itinerary is a no-op.

use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::info;

use crate::agents::registry::AgentRegistry;
use crate::agents::types::{MissionTask, TaskId};
use crate::errors::OptimizeError;
use crate::events::FieldEvent;
use crate::geo::GeoPoint;

/// Distances closer than this are treated as equal
pub const TIE_TOLERANCE_KM: f64 = 1e-6;

/// One entry of a planned route
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedStop {
    pub task_id: TaskId,
    pub eta_minutes: Option<u32>,
}

fn eta_minutes(distance_km: f64, average_speed_kmh: f64) -> Option<u32> {
    if !(average_speed_kmh.is_finite() && average_speed_kmh > 0.0) {
        return None;
    }
    let minutes = (distance_km / average_speed_kmh * 60.0).ceil();
    minutes.is_finite().then(|| minutes.clamp(0.0, u32::MAX as f64) as u32)
}

/// Ordering of two candidates seen from the same cursor; `Less` means `a` goes first
fn compare_candidates(a: (&MissionTask, f64), b: (&MissionTask, f64)) -> Ordering {
    if (a.1 - b.1).abs() > TIE_TOLERANCE_KM {
        return a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal);
    }
    b.0.priority
        .cmp(&a.0.priority)
        .then_with(|| a.0.sequence.cmp(&b.0.sequence))
}

/// Plan the visiting order for `tasks` starting at `origin`
pub fn plan_route(origin: &GeoPoint, tasks: &[MissionTask], average_speed_kmh: f64) -> Vec<PlannedStop> {
    let mut plan = Vec::with_capacity(tasks.len());
    let mut cursor = origin.clone();
    let mut travelled_km = 0.0;

    for task in tasks.iter().filter(|t| t.status.is_active()) {
        let eta = match &task.location {
            Some(location) => {
                travelled_km += cursor.distance_km(location);
                cursor = location.clone();
                eta_minutes(travelled_km, average_speed_kmh)
            }
            None => None,
        };
        plan.push(PlannedStop {
            task_id: task.id.clone(),
            eta_minutes: eta,
        });
    }

    let mut open: Vec<&MissionTask> = tasks.iter().filter(|t| !t.status.is_active()).collect();
    open.sort_by_key(|t| t.sequence);
    let (mut geocoded, ungeocoded): (Vec<&MissionTask>, Vec<&MissionTask>) =
        open.into_iter().partition(|t| t.location.is_some());

    while !geocoded.is_empty() {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (index, task) in geocoded.iter().enumerate() {
            let Some(location) = &task.location else {
                continue;
            };
            let distance = cursor.distance_km(location);
            if index == 0
                || compare_candidates((*task, distance), (geocoded[best], best_distance))
                    == Ordering::Less
            {
                best = index;
                best_distance = distance;
            }
        }

        let next = geocoded.remove(best);
        if let Some(location) = &next.location {
            travelled_km += best_distance;
            cursor = location.clone();
        }
        plan.push(PlannedStop {
            task_id: next.id.clone(),
            eta_minutes: eta_minutes(travelled_km, average_speed_kmh),
        });
    }

    plan.extend(ungeocoded.into_iter().map(|task| PlannedStop {
        task_id: task.id.clone(),
        eta_minutes: None,
    }));
    plan
}

pub struct RouteOptimizer {
    registry: Arc<AgentRegistry>,
    average_speed_kmh: f64,
}

impl RouteOptimizer {
    pub fn new(registry: Arc<AgentRegistry>, average_speed_kmh: f64) -> Self {
        Self {
            registry,
            average_speed_kmh,
        }
    }

    /// Reorder the agent's itinerary in place and return the new order.
    /// Task statuses are left untouched.
    pub async fn optimize(&self, agent_id: &str) -> Result<Vec<MissionTask>, OptimizeError> {
        let agent_id = agent_id.trim();
        if agent_id.is_empty() {
            return Err(OptimizeError::NoAgentSelected);
        }

        let speed = self.average_speed_kmh;
        let itinerary = self
            .registry
            .replan(agent_id, |origin, tasks| plan_route(origin, tasks, speed))
            .await?;

        let order: Vec<String> = itinerary.iter().map(|t| t.id.clone()).collect();
        info!(agent_id = %agent_id, stops = order.len(), "Route optimized");
        self.registry.events().publish(FieldEvent::RouteOptimized {
            agent_id: agent_id.to_string(),
            order,
        });
        Ok(itinerary)
    }
}
