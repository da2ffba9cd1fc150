use anyhow::Result;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{info, warn};

/// Graceful shutdown coordinator for the tracking loop and CLI
pub struct ShutdownCoordinator {
    sender: watch::Sender<bool>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// Receiver handed to long-running loops; flips to `true` once on shutdown
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }

    pub fn trigger(&self) {
        if !*self.sender.borrow() {
            info!("Shutdown requested");
            self.sender.send_replace(true);
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    /// Trigger shutdown on Ctrl-C
    pub async fn wait_for_signal(&self) -> Result<()> {
        info!("Shutdown coordinator ready - will shutdown gracefully on Ctrl-C");
        tokio::signal::ctrl_c().await?;
        self.trigger();
        Ok(())
    }

    /// Signal shutdown and give a background task time to stop
    pub async fn shutdown_task(&self, handle: JoinHandle<()>, grace: Duration) -> Result<()> {
        self.trigger();
        match timeout(grace, handle).await {
            Ok(Ok(())) => {
                info!("Background task stopped cleanly");
                Ok(())
            }
            Ok(Err(e)) => Err(anyhow::anyhow!("Background task failed: {}", e)),
            Err(_) => {
                warn!("Background task did not stop within {:?}", grace);
                Err(anyhow::anyhow!("Timeout waiting for background task to stop"))
            }
        }
    }
}

/// Resolve once the receiver sees shutdown
pub async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            // Coordinator dropped; treat as shutdown
            return;
        }
    }
}
