// Live location tracking: the tick loop and the telemetry sources feeding it

pub mod geo_clock;
pub mod source;

pub use geo_clock::{next_frame, AgentPosition, GeoClock, PositionFrame};
pub use source::{PositionSource, RandomWalk, TelemetrySample};
