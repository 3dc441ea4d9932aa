//! Application state shared across all handlers.

use piper_core::config::{PiperConfig, UploadConfig};
use piper_engine::{CompressionOrchestrator, ProcessEngine};
use piper_storage::{bootstrap_dirs, ArtifactStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<CompressionOrchestrator>,
    pub upload: Arc<UploadConfig>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(orchestrator: CompressionOrchestrator, upload: UploadConfig) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            upload: Arc::new(upload),
            start_time: Instant::now(),
        }
    }

    /// Create the working directories and wire the subprocess engine.
    pub async fn from_config(config: &PiperConfig) -> piper_core::Result<Self> {
        bootstrap_dirs(&[&config.engine.staging_dir, &config.storage.artifact_dir]).await?;
        let engine = ProcessEngine::from_config(&config.engine);
        let store = ArtifactStore::new(&config.storage.artifact_dir);
        info!(
            staging_dir = %config.engine.staging_dir.display(),
            artifact_dir = %config.storage.artifact_dir.display(),
            program = %config.engine.program,
            timeout_secs = config.engine.timeout_secs,
            "compression service configured"
        );
        let orchestrator = CompressionOrchestrator::new(Arc::new(engine), store, config.engine.timeout());
        Ok(Self::new(orchestrator, config.upload.clone()))
    }
}
