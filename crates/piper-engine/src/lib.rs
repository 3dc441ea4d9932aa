//! Piper engine — drives the external Huffman compressor.
//!
//! - `engine`: the `CompressionEngine` capability and its invocation record
//! - `process`: subprocess-backed engine with staged temp files and a timeout
//! - `stats`: best-effort statistics scraping from engine stdout
//! - `orchestrator`: classifies engine outcomes and persists artifacts

pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod process;
pub mod stats;

pub use engine::{CompressionEngine, EngineInvocation, StagedOutput};
pub use error::{CompressionError, EngineError, ErrorKind};
pub use orchestrator::{CompressionOrchestrator, CompressionOutcome, StoredCompression};
pub use process::ProcessEngine;
pub use stats::parse_stats;
