use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures raised while running the engine itself.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to stage input in {dir}: {source}")]
    Staging {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("engine did not finish within {}s", .after.as_secs_f64())]
    Timeout { after: Duration },
    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure categories reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Timeout,
    EngineUnavailable,
    EngineRejected,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::EngineUnavailable => "engine_unavailable",
            Self::EngineRejected => "engine_rejected",
            Self::InternalError => "internal_error",
        }
    }
}

/// Classified outcome of a failed compression request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompressionError {
    #[error("Compression timed out")]
    Timeout,
    #[error("Compression engine unavailable: {0}")]
    EngineUnavailable(String),
    #[error("Compression failed: {stderr}")]
    EngineRejected { exit_code: Option<i32>, stderr: String },
    #[error("Error during compression: {0}")]
    Internal(String),
}

impl CompressionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout => ErrorKind::Timeout,
            Self::EngineUnavailable(_) => ErrorKind::EngineUnavailable,
            Self::EngineRejected { .. } => ErrorKind::EngineRejected,
            Self::Internal(_) => ErrorKind::InternalError,
        }
    }
}

impl From<EngineError> for CompressionError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Timeout { .. } => Self::Timeout,
            EngineError::Launch { .. } => Self::EngineUnavailable(err.to_string()),
            EngineError::Staging { .. } | EngineError::Io(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<piper_core::PiperError> for CompressionError {
    fn from(err: piper_core::PiperError) -> Self {
        Self::Internal(err.to_string())
    }
}
