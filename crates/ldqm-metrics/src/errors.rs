use ldqm_deref::DerefError;
use ldqm_sampling::SamplingError;
use thiserror::Error;

/// Errors emitted while configuring or running metrics.
#[derive(Debug, Error)]
pub enum MetricError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Deref(#[from] DerefError),
    #[error(transparent)]
    Sampling(#[from] SamplingError),
}

/// Result type for metric operations.
pub type Result<T> = std::result::Result<T, MetricError>;
