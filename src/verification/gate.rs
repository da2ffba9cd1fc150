// Verification Gate - per-agent identity capture attempts
//
// idle → capturing → captured → confirmed, or back to idle on cancel or error.
// The camera session lives inside the capturing state, so leaving that state by
// any path drops the session and releases the device.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::camera::{Camera, CameraSession, PhotoArtifact, PhotoHandle};
use crate::agents::registry::AgentRegistry;
use crate::agents::types::AgentId;
use crate::errors::VerificationError;

enum CaptureState {
    Idle,
    Capturing(CameraSession),
    Captured(PhotoArtifact),
    Confirmed(PhotoHandle),
}

impl CaptureState {
    fn phase(&self) -> VerificationPhase {
        match self {
            CaptureState::Idle => VerificationPhase::Idle,
            CaptureState::Capturing(_) => VerificationPhase::Capturing,
            CaptureState::Captured(_) => VerificationPhase::Captured,
            CaptureState::Confirmed(_) => VerificationPhase::Confirmed,
        }
    }
}

/// Observable phase of an agent's verification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationPhase {
    Idle,
    Capturing,
    Captured,
    Confirmed,
}

pub struct VerificationGate {
    registry: Arc<AgentRegistry>,
    camera: Camera,
    attempts: Mutex<HashMap<AgentId, CaptureState>>,
}

impl VerificationGate {
    pub fn new(registry: Arc<AgentRegistry>, camera: Camera) -> Self {
        Self {
            registry,
            camera,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    async fn resolve<'a>(&self, agent_id: &'a str) -> Result<&'a str, VerificationError> {
        let agent_id = agent_id.trim();
        if agent_id.is_empty() || !self.registry.contains(agent_id).await {
            return Err(VerificationError::NoAgentSelected);
        }
        Ok(agent_id)
    }

    /// Open the camera and enter capturing
    pub async fn begin_verification(&self, agent_id: &str) -> Result<(), VerificationError> {
        let agent_id = self.resolve(agent_id).await?;
        let mut attempts = self.attempts.lock().await;
        if matches!(
            attempts.get(agent_id),
            Some(CaptureState::Capturing(_) | CaptureState::Captured(_))
        ) {
            return Err(VerificationError::AttemptInProgress(agent_id.to_string()));
        }

        match self.camera.open().await {
            Ok(session) => {
                attempts.insert(agent_id.to_string(), CaptureState::Capturing(session));
                info!(agent_id = %agent_id, "Verification capture started");
                Ok(())
            }
            Err(e) => {
                attempts.insert(agent_id.to_string(), CaptureState::Idle);
                warn!(agent_id = %agent_id, error = %e, "Camera could not be opened");
                Err(VerificationError::CameraUnavailable(e.to_string()))
            }
        }
    }

    /// Take the photo. The camera is released whether or not the frame is usable.
    pub async fn capture_verification(&self, agent_id: &str) -> Result<PhotoHandle, VerificationError> {
        let agent_id = self.resolve(agent_id).await?;
        let mut attempts = self.attempts.lock().await;

        let session = match attempts.remove(agent_id) {
            Some(CaptureState::Capturing(session)) => session,
            other => {
                if let Some(state) = other {
                    attempts.insert(agent_id.to_string(), state);
                }
                return Err(VerificationError::NotCapturing(agent_id.to_string()));
            }
        };

        let result = session.capture().await;
        drop(session);
        match result {
            Ok(photo) => {
                let handle = photo.handle.clone();
                attempts.insert(agent_id.to_string(), CaptureState::Captured(photo));
                info!(agent_id = %agent_id, photo = %handle, "Verification photo captured");
                Ok(handle)
            }
            Err(e) => {
                attempts.insert(agent_id.to_string(), CaptureState::Idle);
                warn!(agent_id = %agent_id, error = %e, "Verification capture failed");
                Err(VerificationError::CameraUnavailable(e.to_string()))
            }
        }
    }

    /// Abandon the attempt; a held camera is released and the pending photo discarded
    pub async fn cancel_verification(&self, agent_id: &str) -> Result<(), VerificationError> {
        let agent_id = self.resolve(agent_id).await?;
        let mut attempts = self.attempts.lock().await;
        if matches!(
            attempts.get(agent_id),
            Some(CaptureState::Capturing(_) | CaptureState::Captured(_))
        ) {
            attempts.insert(agent_id.to_string(), CaptureState::Idle);
            info!(agent_id = %agent_id, "Verification cancelled");
        }
        Ok(())
    }

    /// Attach the captured photo to the agent and mark it verified
    pub async fn confirm_verification(
        &self,
        agent_id: &str,
        photo: &PhotoHandle,
    ) -> Result<(), VerificationError> {
        let agent_id = self.resolve(agent_id).await?;
        let mut attempts = self.attempts.lock().await;
        match attempts.get(agent_id) {
            Some(CaptureState::Captured(pending)) if pending.handle == *photo => {}
            _ => return Err(VerificationError::VerificationNotConfirmed(agent_id.to_string())),
        }

        self.registry.confirm_identity(agent_id, photo.clone()).await?;
        attempts.insert(agent_id.to_string(), CaptureState::Confirmed(photo.clone()));
        Ok(())
    }

    pub async fn phase(&self, agent_id: &str) -> VerificationPhase {
        self.attempts
            .lock()
            .await
            .get(agent_id)
            .map(CaptureState::phase)
            .unwrap_or(VerificationPhase::Idle)
    }

    /// Drop any attempt for a departed agent
    pub async fn forget(&self, agent_id: &str) {
        self.attempts.lock().await.remove(agent_id);
    }

    pub fn camera_in_use(&self) -> bool {
        self.camera.is_in_use()
    }
}
