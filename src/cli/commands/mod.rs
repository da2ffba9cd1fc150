use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::agents::DispatchCoordinator;
use crate::config::FieldDispatchConfig;
use crate::roster::ShiftManifest;
use crate::verification::{Camera, SimulatedCamera};

pub mod dispatch;
pub mod optimize;
pub mod pool;
pub mod status;
pub mod track;
pub mod verify;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

/// What every command needs: settings, the manifest location and the output mode
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub settings: FieldDispatchConfig,
    pub manifest_path: PathBuf,
    pub json: bool,
}

impl CommandContext {
    pub fn new(settings: FieldDispatchConfig, manifest: Option<PathBuf>, json: bool) -> Self {
        let manifest_path =
            manifest.unwrap_or_else(|| PathBuf::from(&settings.shift.manifest_path));
        Self {
            settings,
            manifest_path,
            json,
        }
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }
}

/// Load the shift and hand a ready coordinator to `f`
pub async fn with_coordinator<F, Fut, R>(context: &CommandContext, f: F) -> Result<R>
where
    F: FnOnce(DispatchCoordinator) -> Fut,
    Fut: std::future::Future<Output = Result<R>>,
{
    let manifest = ShiftManifest::load(context.manifest_path())?;
    let camera = Camera::new(Arc::new(SimulatedCamera::new()));
    let coordinator = DispatchCoordinator::from_manifest(&context.settings, &manifest, camera).await?;
    f(coordinator).await
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
