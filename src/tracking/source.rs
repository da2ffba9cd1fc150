use rand::Rng;

use crate::errors::TelemetryError;
use crate::geo::Displacement;

/// One reading for one agent
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetrySample {
    pub displacement: Displacement,
    pub battery_level: Option<u8>,
    pub signal_strength: Option<u8>,
}

impl TelemetrySample {
    pub fn moved(d_lat: f64, d_lng: f64) -> Self {
        Self {
            displacement: Displacement::new(d_lat, d_lng),
            ..Self::default()
        }
    }
}

/// Where per-tick movement comes from: a simulation or a device feed
#[cfg_attr(test, mockall::automock)]
pub trait PositionSource: Send + Sync {
    fn sample(&self, agent_id: &str) -> Result<TelemetrySample, TelemetryError>;
}

/// Uniform jitter within ±bound degrees on each axis
#[derive(Debug, Clone)]
pub struct RandomWalk {
    bound_deg: f64,
}

impl RandomWalk {
    pub fn new(bound_deg: f64) -> Self {
        Self {
            bound_deg: bound_deg.abs(),
        }
    }
}

impl PositionSource for RandomWalk {
    fn sample(&self, _agent_id: &str) -> Result<TelemetrySample, TelemetryError> {
        if self.bound_deg == 0.0 {
            return Ok(TelemetrySample::default());
        }
        let mut rng = rand::rng();
        let bound = self.bound_deg;
        Ok(TelemetrySample::moved(
            rng.random_range(-bound..=bound),
            rng.random_range(-bound..=bound),
        ))
    }
}
