//! Compression orchestration: run the engine, classify what happened,
//! derive statistics and persist the artifact.

use crate::engine::{CompressionEngine, EngineInvocation};
use crate::error::CompressionError;
use crate::stats::parse_stats;
use piper_core::types::{ArtifactRecord, CompressionStats};
use piper_storage::ArtifactStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Result of a successful compression request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionOutcome {
    /// Statistics as reported by the engine, with measured fallbacks.
    pub stats: CompressionStats,
    /// UTF-8 byte length of the input.
    pub original_size: u64,
    /// Length of `data`.
    pub compressed_size: u64,
    pub data: Vec<u8>,
    /// The engine exited cleanly but wrote no output; `data` is the input.
    pub output_fallback: bool,
}

/// A compression outcome together with the artifact it was stored as.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCompression {
    pub artifact: ArtifactRecord,
    pub outcome: CompressionOutcome,
}

pub struct CompressionOrchestrator {
    engine: Arc<dyn CompressionEngine>,
    store: ArtifactStore,
    timeout: Duration,
}

impl CompressionOrchestrator {
    pub fn new(engine: Arc<dyn CompressionEngine>, store: ArtifactStore, timeout: Duration) -> Self {
        Self { engine, store, timeout }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Compress `text` with the engine.
    ///
    /// Every failure comes back classified; nothing escapes as a panic.
    pub async fn compress(&self, text: &str) -> Result<CompressionOutcome, CompressionError> {
        let input = text.as_bytes().to_vec();
        let original_size = input.len() as u64;

        // Run on its own task so a panicking engine surfaces as a JoinError
        // and the child is still reaped if the caller goes away.
        let engine = self.engine.clone();
        let timeout = self.timeout;
        let staged_input = input.clone();
        let invocation = tokio::spawn(async move { engine.invoke(&staged_input, timeout).await })
            .await
            .map_err(|e| {
                error!(op = "compress.panic", error = %e, "engine task failed");
                CompressionError::Internal(e.to_string())
            })?;

        let invocation = match invocation {
            Ok(inv) => inv,
            Err(e) => {
                let err = CompressionError::from(e);
                warn!(op = "compress.failed", kind = err.kind().as_str(), error = %err, "engine invocation failed");
                return Err(err);
            }
        };

        self.complete(invocation, input, original_size).await
    }

    async fn complete(
        &self,
        invocation: EngineInvocation,
        input: Vec<u8>,
        original_size: u64,
    ) -> Result<CompressionOutcome, CompressionError> {
        let EngineInvocation { exit_code, stdout, stderr, elapsed, output } = invocation;

        if exit_code != Some(0) {
            if let Some(out) = output {
                out.discard().await;
            }
            warn!(
                op = "compress.rejected",
                exit_code = ?exit_code,
                stderr = %stderr.trim(),
                "engine exited with failure"
            );
            return Err(CompressionError::EngineRejected { exit_code, stderr });
        }

        let (data, output_fallback) = match output {
            Some(out) => {
                let data = out
                    .take()
                    .await
                    .map_err(|e| CompressionError::Internal(format!("read engine output: {e}")))?;
                (data, false)
            }
            None => {
                warn!(
                    op = "engine.output_missing",
                    original_size,
                    "engine reported success without output; storing input unchanged"
                );
                (input, true)
            }
        };

        let compressed_size = data.len() as u64;
        let stats = parse_stats(&stdout, original_size, compressed_size);

        info!(
            op = "compress.done",
            original_size,
            compressed_size,
            ratio = stats.compression_ratio,
            output_fallback,
            elapsed_ms = elapsed.as_millis() as u64,
            "compression finished"
        );

        Ok(CompressionOutcome {
            stats,
            original_size,
            compressed_size,
            data,
            output_fallback,
        })
    }

    /// Compress `text` and store the result as a new artifact.
    pub async fn compress_and_store(
        &self,
        display_name: &str,
        text: &str,
    ) -> Result<StoredCompression, CompressionError> {
        let outcome = self.compress(text).await?;
        let artifact = self.store.put(display_name, &outcome.data).await.map_err(|e| {
            error!(op = "compress.store_failed", error = %e, "failed to persist artifact");
            CompressionError::from(e)
        })?;
        Ok(StoredCompression { artifact, outcome })
    }
}
