use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sizes and space savings for one compression run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionStats {
    pub original_size: u64,
    pub compressed_size: u64,
    /// Percentage of space saved. Negative when the output grew.
    pub compression_ratio: f64,
}

impl CompressionStats {
    /// Build stats from sizes alone, deriving the ratio.
    pub fn from_sizes(original_size: u64, compressed_size: u64) -> Self {
        Self {
            original_size,
            compressed_size,
            compression_ratio: savings_pct(original_size, compressed_size),
        }
    }
}

/// Space saved as a percentage of `original`. Zero when `original` is zero.
pub fn savings_pct(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (original as f64 - compressed as f64) / original as f64 * 100.0
}

/// Metadata for a stored compressed artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub id: Uuid,
    pub display_name: String,
    /// File name on disk: `{id}_{display_name}.compressed`.
    pub stored_name: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

impl ArtifactRecord {
    pub fn new(display_name: impl Into<String>, size: u64) -> Self {
        let id = Uuid::new_v4();
        let display_name = display_name.into();
        let stored_name = Self::stored_name_for(&id, &display_name);
        Self {
            id,
            display_name,
            stored_name,
            size,
            created_at: Utc::now(),
        }
    }

    pub fn stored_name_for(id: &Uuid, display_name: &str) -> String {
        format!("{id}_{display_name}.compressed")
    }
}
