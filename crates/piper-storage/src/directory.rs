//! One-time creation of the service's working directories.

use piper_core::error::{PiperError, Result};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Create every directory in `dirs` (and parents). Safe to call repeatedly.
pub async fn bootstrap_dirs<P: AsRef<Path>>(dirs: &[P]) -> Result<()> {
    for dir in dirs {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .await
            .map_err(|e| PiperError::Storage(format!("mkdir {}: {e}", dir.display())))?;
        debug!(dir = %dir.display(), "directory ready");
    }
    Ok(())
}
