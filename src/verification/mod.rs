// Identity verification: camera access and the per-agent capture state machine

pub mod camera;
pub mod gate;

pub use camera::{
    Camera, CameraDevice, CameraError, CameraSession, PhotoArtifact, PhotoHandle, SimulatedCamera,
};
pub use gate::{VerificationGate, VerificationPhase};
