//! Piper storage layer: compressed artifacts on the local filesystem.

pub mod artifact_store;
pub mod directory;
pub mod sanitize;

pub use artifact_store::{ArtifactStore, StoredArtifact};
pub use directory::bootstrap_dirs;
pub use sanitize::{display_name_for, sanitize_filename};
