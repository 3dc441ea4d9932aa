pub mod config;
pub mod error;
pub mod types;

pub use config::PiperConfig;
pub use error::{PiperError, Result};
pub use types::{ArtifactRecord, CompressionStats};
