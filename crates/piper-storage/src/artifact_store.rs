//! Filesystem-backed store for compressed artifacts.
//!
//! Each artifact is one file named `{id}_{display_name}.compressed` under the
//! store root. Files are created once and never rewritten.

use piper_core::error::{PiperError, Result};
use piper_core::types::ArtifactRecord;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Bytes of an artifact found by id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredArtifact {
    pub stored_name: String,
    pub data: Vec<u8>,
}

/// Artifact store rooted at a single directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store over `root` without touching the filesystem.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a store, making sure `root` exists.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(root);
        crate::directory::bootstrap_dirs(&[&store.root]).await?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist `data` under a fresh id. Fails rather than overwrite.
    pub async fn put(&self, display_name: &str, data: &[u8]) -> Result<ArtifactRecord> {
        let record = ArtifactRecord::new(display_name, data.len() as u64);
        let path = self.root.join(&record.stored_name);

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| PiperError::Storage(format!("create {}: {e}", record.stored_name)))?;

        let written = async {
            file.write_all(data).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            if let Err(rm) = fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %rm, "failed to remove partial artifact");
            }
            return Err(PiperError::Storage(format!("write {}: {e}", record.stored_name)));
        }

        info!(
            op = "artifact.put",
            artifact_id = %record.id,
            size = record.size,
            "stored artifact {}",
            record.stored_name
        );
        Ok(record)
    }

    /// Read the first artifact (in name order) whose file name starts with `id`.
    pub async fn find_by_prefix(&self, id: &str) -> Result<StoredArtifact> {
        let stored_name = self.resolve(id).await?;
        let data = fs::read(self.root.join(&stored_name))
            .await
            .map_err(|e| PiperError::Storage(format!("read {stored_name}: {e}")))?;
        debug!(op = "artifact.get", artifact_id = id, size = data.len(), "read artifact");
        Ok(StoredArtifact { stored_name, data })
    }

    /// Stored file name for `id`, without reading its contents.
    pub async fn resolve(&self, id: &str) -> Result<String> {
        if !is_valid_id(id) {
            return Err(PiperError::InvalidArtifactId(id.to_string()));
        }

        let mut rd = fs::read_dir(&self.root)
            .await
            .map_err(|e| PiperError::Storage(format!("ls {}: {e}", self.root.display())))?;

        let mut matches = Vec::new();
        while let Some(entry) = rd
            .next_entry()
            .await
            .map_err(|e| PiperError::Storage(format!("ls entry: {e}")))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with(id) {
                continue;
            }
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if is_file {
                matches.push(name);
            }
        }

        if matches.len() > 1 {
            warn!(artifact_id = id, count = matches.len(), "multiple artifacts share an id prefix");
        }
        matches.sort();
        matches
            .into_iter()
            .next()
            .ok_or_else(|| PiperError::ArtifactNotFound { id: id.to_string() })
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && !id.contains(['/', '\\']) && id != "." && id != ".."
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store() -> (TempDir, ArtifactStore) {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::open(tmp.path().join("compressed")).await.unwrap();
        (tmp, store)
    }

    #[tokio::test]
    async fn test_put_then_find() {
        let (_tmp, store) = store().await;
        let data = vec![0u8, 1, 2, 255, 254];
        let rec = store.put("a.txt", &data).await.unwrap();
        assert_eq!(rec.display_name, "a.txt");
        assert_eq!(rec.size, 5);

        let found = store.find_by_prefix(&rec.id.to_string()).await.unwrap();
        assert_eq!(found.data, data);
        assert_eq!(found.stored_name, rec.stored_name);
    }

    #[tokio::test]
    async fn test_stored_name_layout() {
        let (_tmp, store) = store().await;
        let rec = store.put("report.csv", b"x").await.unwrap();
        let path = store.root().join(format!("{}_report.csv.compressed", rec.id));
        assert!(path.is_file());
    }

    #[tokio::test]
    async fn test_empty_artifact() {
        let (_tmp, store) = store().await;
        let rec = store.put("empty.txt", b"").await.unwrap();
        let found = store.find_by_prefix(&rec.id.to_string()).await.unwrap();
        assert!(found.data.is_empty());
    }

    #[tokio::test]
    async fn test_find_unknown_id() {
        let (_tmp, store) = store().await;
        store.put("a.txt", b"abc").await.unwrap();
        let err = store
            .find_by_prefix("00000000-0000-0000-0000-000000000000")
            .await
            .unwrap_err();
        assert!(matches!(err, PiperError::ArtifactNotFound { .. }));
    }

    #[tokio::test]
    async fn test_invalid_ids_rejected() {
        let (_tmp, store) = store().await;
        store.put("a.txt", b"abc").await.unwrap();
        for id in ["", "..", "../etc", "a\\b"] {
            let err = store.find_by_prefix(id).await.unwrap_err();
            assert!(matches!(err, PiperError::InvalidArtifactId(_)), "id {id:?}");
        }
    }

    #[tokio::test]
    async fn test_same_display_name_distinct_artifacts() {
        let (_tmp, store) = store().await;
        let a = store.put("same.txt", b"first").await.unwrap();
        let b = store.put("same.txt", b"second").await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.find_by_prefix(&a.id.to_string()).await.unwrap().data, b"first");
        assert_eq!(store.find_by_prefix(&b.id.to_string()).await.unwrap().data, b"second");
    }

    #[tokio::test]
    async fn test_prefix_collision_is_deterministic() {
        let (_tmp, store) = store().await;
        std::fs::write(store.root().join("abc_b.txt.compressed"), b"b").unwrap();
        std::fs::write(store.root().join("abc_a.txt.compressed"), b"a").unwrap();
        let found = store.find_by_prefix("abc").await.unwrap();
        assert_eq!(found.stored_name, "abc_a.txt.compressed");
        assert_eq!(found.data, b"a");
    }

    #[tokio::test]
    async fn test_directories_ignored() {
        let (_tmp, store) = store().await;
        std::fs::create_dir(store.root().join("dead_dir")).unwrap();
        let err = store.find_by_prefix("dead").await.unwrap_err();
        assert!(matches!(err, PiperError::ArtifactNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_root_is_storage_error() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path().join("nope"));
        let err = store.find_by_prefix("abc").await.unwrap_err();
        assert!(matches!(err, PiperError::Storage(_)));
        assert!(store.put("a.txt", b"x").await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_puts() {
        let (_tmp, store) = store().await;
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let body = format!("payload {i}");
                let rec = store.put("same.txt", body.as_bytes()).await.unwrap();
                (rec, body)
            }));
        }
        let mut ids = std::collections::HashSet::new();
        for h in handles {
            let (rec, body) = h.await.unwrap();
            assert!(ids.insert(rec.id));
            let found = store.find_by_prefix(&rec.id.to_string()).await.unwrap();
            assert_eq!(found.data, body.as_bytes());
        }
        assert_eq!(ids.len(), 32);
    }
}
