use thiserror::Error;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Document read error: {0}")]
    DocumentRead(String),
    #[error("Embedding error: {0}")]
    Embedding(String),
    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Generation backend unreachable: {0}")]
    GenerationConnection(String),
    #[error("Generation timed out after {0}s")]
    GenerationTimeout(u64),
    #[error("Generation backend returned an error: {0}")]
    GenerationStatus(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
}
