use thiserror::Error;

/// Errors emitted by the dereferencing engine.
///
/// Per-URI failures are never reported here; they are recorded on the
/// cached [`FetchOutcome`](crate::FetchOutcome) instead.
#[derive(Debug, Error)]
pub enum DerefError {
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("unknown cache: {0}")]
    UnknownCache(String),
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for dereferencing operations.
pub type Result<T> = std::result::Result<T, DerefError>;
