use std::path::Path;

use ldqm_deref::{DerefOptions, RetryPolicy};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::errors::{MetricError, Result};

/// Parameters of the bounded-memory structures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Reservoir capacity for estimated dereferenceability.
    pub reservoir_size: usize,
    /// Number of bloom filters in the duplicate filter.
    pub filter_count: usize,
    /// Expected number of distinct instances across all filters.
    pub expected_items: u64,
    pub false_positive_rate: f64,
    /// Fixed seed for reproducible samples and filter hashing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            reservoir_size: 6_000,
            filter_count: 13,
            expected_items: 5_500_000,
            false_positive_rate: 0.01,
            seed: None,
        }
    }
}

/// Everything one assessment run needs. Every section is optional in TOML.
///
/// ```toml
/// spill_threshold = 50000
///
/// [deref]
/// workers = 16
/// timeout_ms = 3000
///
/// [retry]
/// max_rounds = 20
///
/// [sampling]
/// seed = 42
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentConfig {
    pub deref: DerefOptions,
    pub retry: RetryPolicy,
    pub sampling: SamplingConfig,
    /// Distinct URIs kept in memory before a metric's URI set spills to disk.
    pub spill_threshold: usize,
    /// Restricts performance sampling to subjects under this prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_uri: Option<String>,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            deref: DerefOptions::default(),
            retry: RetryPolicy::default(),
            sampling: SamplingConfig::default(),
            spill_threshold: 100_000,
            dataset_uri: None,
        }
    }
}

impl AssessmentConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AssessmentConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.deref.validate()?;
        if self.spill_threshold == 0 {
            return Err(MetricError::InvalidConfig(
                "spill_threshold must be positive".to_string(),
            ));
        }
        if self.sampling.reservoir_size == 0 {
            return Err(MetricError::InvalidConfig(
                "sampling.reservoir_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Random source for one metric. With a configured seed, `stream`
    /// separates metrics so they do not share a sequence.
    pub fn rng(&self, stream: u64) -> ChaCha8Rng {
        match self.sampling.seed {
            Some(seed) => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(stream);
                rng
            }
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        }
    }
}
