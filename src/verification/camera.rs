// Camera - device seam for identity capture
//
// A `CameraSession` holds the single device lease and gives the device back
// when dropped, whichever way capturing ends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("camera is in use by another verification")]
    Busy,
    #[error("camera device not available: {0}")]
    DeviceUnavailable(String),
    #[error("frame capture failed: {0}")]
    CaptureFailed(String),
}

/// Reference to a stored verification photo
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhotoHandle(String);

impl PhotoHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn generate() -> Self {
        Self(format!("photo-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhotoHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A captured photo not yet attached to any agent
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoArtifact {
    pub handle: PhotoHandle,
    pub bytes: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

/// Hardware (or browser) camera behind the verification gate
#[async_trait]
pub trait CameraDevice: Send + Sync {
    async fn acquire(&self) -> Result<(), CameraError>;

    async fn capture_frame(&self) -> Result<Vec<u8>, CameraError>;

    /// Must be cheap and infallible; called from `Drop`
    fn release(&self);
}

/// Single-lease access to a camera device
#[derive(Clone)]
pub struct Camera {
    device: Arc<dyn CameraDevice>,
    lease: Arc<Semaphore>,
}

impl Camera {
    pub fn new(device: Arc<dyn CameraDevice>) -> Self {
        Self {
            device,
            lease: Arc::new(Semaphore::new(1)),
        }
    }

    /// Take the lease and open the device
    pub async fn open(&self) -> Result<CameraSession, CameraError> {
        let permit = self
            .lease
            .clone()
            .try_acquire_owned()
            .map_err(|_| CameraError::Busy)?;
        // Permit drops on error, freeing the lease
        self.device.acquire().await?;
        Ok(CameraSession {
            device: Arc::clone(&self.device),
            _permit: permit,
        })
    }

    pub fn is_in_use(&self) -> bool {
        self.lease.available_permits() == 0
    }
}

impl fmt::Debug for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Camera")
            .field("in_use", &self.is_in_use())
            .finish()
    }
}

pub struct CameraSession {
    device: Arc<dyn CameraDevice>,
    _permit: OwnedSemaphorePermit,
}

impl CameraSession {
    pub async fn capture(&self) -> Result<PhotoArtifact, CameraError> {
        let bytes = self.device.capture_frame().await?;
        if bytes.is_empty() {
            return Err(CameraError::CaptureFailed("empty frame".to_string()));
        }
        Ok(PhotoArtifact {
            handle: PhotoHandle::generate(),
            bytes,
            captured_at: Utc::now(),
        })
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.device.release();
        tracing::debug!("Camera released");
    }
}

impl fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CameraSession")
    }
}

/// Camera used by the CLI and tests: produces a small synthetic JPEG frame
/// and counts how often it was opened and released.
#[derive(Debug, Default)]
pub struct SimulatedCamera {
    opened: AtomicUsize,
    released: AtomicUsize,
    unplugged: bool,
    blank_frames: bool,
}

impl SimulatedCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// A camera that refuses to open
    pub fn unplugged() -> Self {
        Self {
            unplugged: true,
            ..Self::default()
        }
    }

    /// A camera that opens but only ever returns empty frames
    pub fn blank() -> Self {
        Self {
            blank_frames: true,
            ..Self::default()
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn is_held(&self) -> bool {
        self.opened() > self.released()
    }
}

#[async_trait]
impl CameraDevice for SimulatedCamera {
    async fn acquire(&self) -> Result<(), CameraError> {
        if self.unplugged {
            return Err(CameraError::DeviceUnavailable("no video input".to_string()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn capture_frame(&self) -> Result<Vec<u8>, CameraError> {
        if self.blank_frames {
            return Ok(Vec::new());
        }
        // JPEG SOI marker followed by a tiny payload
        Ok(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46])
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
