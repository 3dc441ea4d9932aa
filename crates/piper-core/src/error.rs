use thiserror::Error;

#[derive(Error, Debug)]
pub enum PiperError {
    #[error("Artifact not found: {id}")]
    ArtifactNotFound { id: String },
    #[error("Invalid artifact id: {0}")]
    InvalidArtifactId(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PiperError>;
