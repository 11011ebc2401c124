use thiserror::Error;

/// Errors emitted by the sampling structures.
#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("invalid reservoir capacity: {0}")]
    InvalidCapacity(usize),
    #[error("invalid filter parameters: {0}")]
    InvalidFilter(String),
    #[error("invalid spill threshold: {0}")]
    InvalidThreshold(usize),
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sampling operations.
pub type Result<T> = std::result::Result<T, SamplingError>;
