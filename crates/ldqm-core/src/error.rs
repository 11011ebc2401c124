use thiserror::Error;

/// Core error type shared across the metrics crates.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The token is not an absolute http(s) URI.
    #[error("invalid uri: {0}")]
    InvalidUri(String),
    /// A line of statement input could not be parsed.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Convenience alias for results returned by the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
