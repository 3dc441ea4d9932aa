//! The compression engine capability.

use crate::error::EngineError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::warn;

/// Something that turns input bytes into a compressed output file.
///
/// Implementations stage `input`, run to completion within `timeout` and
/// report what happened. A non-zero exit is a normal return, not an error.
#[async_trait]
pub trait CompressionEngine: Send + Sync {
    async fn invoke(&self, input: &[u8], timeout: Duration) -> Result<EngineInvocation, EngineError>;
}

/// Record of one finished engine run.
#[derive(Debug)]
pub struct EngineInvocation {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
    /// Output file left by the engine. `None` means the engine wrote nothing.
    pub output: Option<StagedOutput>,
}

impl EngineInvocation {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn output_missing(&self) -> bool {
        self.output.is_none()
    }
}

/// An engine output file that the caller now owns and must consume or discard.
#[derive(Debug)]
pub struct StagedOutput {
    path: PathBuf,
}

impl StagedOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file, then delete it.
    pub async fn take(self) -> std::io::Result<Vec<u8>> {
        let data = fs::read(&self.path).await?;
        self.discard().await;
        Ok(data)
    }

    /// Best-effort removal.
    pub async fn discard(self) {
        if let Err(e) = fs::remove_file(&self.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove staged output");
            }
        }
    }
}
