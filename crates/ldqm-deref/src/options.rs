use std::time::Duration;

use ldqm_core::RDF_ACCEPT_HEADER;
use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::errors::{DerefError, Result};

/// Options for the HTTP fetcher and the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DerefOptions {
    /// Number of worker threads draining the queue.
    pub workers: usize,
    /// Per-request timeout.
    pub timeout_ms: u64,
    /// Maximum number of redirects followed per URI.
    pub max_hops: u32,
    /// Bodies larger than this are never considered parsable.
    pub max_body_bytes: u64,
    /// Optional user agent override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// `Accept` header sent with every request.
    pub accept: String,
    /// Capacity of each named result cache.
    pub cache_capacity: usize,
}

impl Default for DerefOptions {
    fn default() -> Self {
        Self {
            workers: 8,
            timeout_ms: 5_000,
            max_hops: 5,
            max_body_bytes: 1024 * 1024,
            user_agent: None,
            accept: RDF_ACCEPT_HEADER.to_string(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl DerefOptions {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(DerefError::InvalidOptions(
                "workers must be positive".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(DerefError::InvalidOptions(
                "timeout_ms must be positive".to_string(),
            ));
        }
        if self.max_hops == 0 {
            return Err(DerefError::InvalidOptions(
                "max_hops must be positive".to_string(),
            ));
        }
        if self.cache_capacity == 0 {
            return Err(DerefError::InvalidOptions(
                "cache_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn user_agent(&self) -> String {
        match &self.user_agent {
            Some(agent) => agent.clone(),
            None => format!("{} - {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Bounds for the caller-side drain loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Consecutive polling rounds without any new outcome before giving up.
    pub max_rounds: u32,
    /// Sleep between polling rounds.
    pub poll_interval_ms: u64,
    /// Optional wall-clock budget for the whole drain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_elapsed_ms: Option<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_rounds: 300,
            poll_interval_ms: 100,
            max_elapsed_ms: None,
        }
    }
}

impl RetryPolicy {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_elapsed(&self) -> Option<Duration> {
        self.max_elapsed_ms.map(Duration::from_millis)
    }
}
