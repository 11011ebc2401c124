use std::collections::BTreeMap;

use ldqm_core::{Statement, is_possible_url};
use ldqm_deref::HttpFetcher;
use ldqm_sampling::ReservoirSampler;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::config::AssessmentConfig;
use crate::errors::Result;
use crate::metric::QualityMetric;

/// Average response time that still scores 1.0.
pub const NORM_TOTAL_RESPONSE_TIME_MS: f64 = 1000.0;
/// Served requests per millisecond that still scores 1.0.
pub const NORM_SERVED_REQS_PER_MILLISEC: f64 = 0.002;

pub const LATENCY_SAMPLE_SIZE: usize = 15;
pub const LATENCY_REQUESTS: u32 = 1;
pub const THROUGHPUT_SAMPLE_SIZE: usize = 10;
pub const THROUGHPUT_REQUESTS: u32 = 5;

const LATENCY_STREAM: u64 = 3;
const THROUGHPUT_STREAM: u64 = 4;

/// Score for an average response time, clamped to `[0, 1]`.
pub fn latency_score(avg_response_ms: f64) -> f64 {
    if avg_response_ms <= 0.0 {
        return 1.0;
    }
    (NORM_TOTAL_RESPONSE_TIME_MS / avg_response_ms).clamp(0.0, 1.0)
}

/// Score for `requests` served within `avg_burst_ms`, clamped to `[0, 1]`.
pub fn throughput_score(requests: u32, avg_burst_ms: f64) -> f64 {
    if avg_burst_ms <= 0.0 {
        return 1.0;
    }
    let served_per_ms = f64::from(requests) / avg_burst_ms;
    (served_per_ms / NORM_SERVED_REQS_PER_MILLISEC).clamp(0.0, 1.0)
}

/// Reservoir of subject URIs that belong to the assessed dataset.
struct SubjectSample {
    sampler: ReservoirSampler<String, ChaCha8Rng>,
    dataset_uri: Option<String>,
}

impl SubjectSample {
    fn new(capacity: usize, config: &AssessmentConfig, stream: u64) -> Result<Self> {
        Ok(Self {
            sampler: ReservoirSampler::with_rng(capacity, true, config.rng(stream))?,
            dataset_uri: config.dataset_uri.clone(),
        })
    }

    fn offer(&self, statement: &Statement) {
        let Some(subject) = statement.subject.as_iri() else {
            return;
        };
        let in_dataset = match &self.dataset_uri {
            Some(prefix) => subject.starts_with(prefix.as_str()),
            None => true,
        };
        if in_dataset && is_possible_url(subject) {
            self.sampler.add_if_absent(subject.to_string());
        }
    }

    /// Mean total burst delay per sampled URI, or `None` without samples.
    fn average_burst(&self, fetcher: &HttpFetcher, requests: u32) -> Option<(f64, u128)> {
        let sample = self.sampler.items();
        if sample.is_empty() {
            return None;
        }
        let total: u128 = sample
            .iter()
            .map(|uri| fetcher.measure_burst_delay(uri, requests))
            .sum();
        Some((total as f64 / sample.len() as f64, total))
    }
}

/// How quickly sampled subjects answer a single request.
pub struct LowLatency {
    fetcher: HttpFetcher,
    sample: SubjectSample,
    total_delay_ms: u128,
    value: Option<f64>,
}

impl LowLatency {
    pub fn new(fetcher: HttpFetcher, config: &AssessmentConfig) -> Result<Self> {
        Ok(Self {
            fetcher,
            sample: SubjectSample::new(LATENCY_SAMPLE_SIZE, config, LATENCY_STREAM)?,
            total_delay_ms: 0,
            value: None,
        })
    }
}

impl QualityMetric for LowLatency {
    fn name(&self) -> &'static str {
        "low_latency"
    }

    fn compute(&mut self, statement: &Statement) -> Result<()> {
        self.sample.offer(statement);
        Ok(())
    }

    /// Zero when no subject could be sampled.
    fn metric_value(&mut self) -> Result<f64> {
        if let Some(value) = self.value {
            return Ok(value);
        }
        let value = match self.sample.average_burst(&self.fetcher, LATENCY_REQUESTS) {
            Some((avg_burst, total)) => {
                self.total_delay_ms = total;
                latency_score(avg_burst / f64::from(LATENCY_REQUESTS))
            }
            None => 0.0,
        };
        info!(
            total_delay_ms = self.total_delay_ms as u64,
            samples = self.sample.sampler.size(),
            value,
            "latency measured"
        );
        self.value = Some(value);
        Ok(value)
    }

    fn is_estimate(&self) -> bool {
        true
    }

    fn counters(&self) -> BTreeMap<&'static str, u64> {
        BTreeMap::from([
            ("sampled_uris", self.sample.sampler.size() as u64),
            ("total_delay_ms", self.total_delay_ms as u64),
        ])
    }
}

/// How many requests per millisecond sampled subjects serve in a burst.
pub struct HighThroughput {
    fetcher: HttpFetcher,
    sample: SubjectSample,
    total_delay_ms: u128,
    value: Option<f64>,
}

impl HighThroughput {
    pub fn new(fetcher: HttpFetcher, config: &AssessmentConfig) -> Result<Self> {
        Ok(Self {
            fetcher,
            sample: SubjectSample::new(THROUGHPUT_SAMPLE_SIZE, config, THROUGHPUT_STREAM)?,
            total_delay_ms: 0,
            value: None,
        })
    }
}

impl QualityMetric for HighThroughput {
    fn name(&self) -> &'static str {
        "high_throughput"
    }

    fn compute(&mut self, statement: &Statement) -> Result<()> {
        self.sample.offer(statement);
        Ok(())
    }

    /// Zero when no subject could be sampled.
    fn metric_value(&mut self) -> Result<f64> {
        if let Some(value) = self.value {
            return Ok(value);
        }
        let value = match self.sample.average_burst(&self.fetcher, THROUGHPUT_REQUESTS) {
            Some((avg_burst, total)) => {
                self.total_delay_ms = total;
                throughput_score(THROUGHPUT_REQUESTS, avg_burst)
            }
            None => 0.0,
        };
        info!(
            total_delay_ms = self.total_delay_ms as u64,
            samples = self.sample.sampler.size(),
            value,
            "throughput measured"
        );
        self.value = Some(value);
        Ok(value)
    }

    fn is_estimate(&self) -> bool {
        true
    }

    fn counters(&self) -> BTreeMap<&'static str, u64> {
        BTreeMap::from([
            ("sampled_uris", self.sample.sampler.size() as u64),
            ("total_delay_ms", self.total_delay_ms as u64),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_scores_are_normalised() {
        assert_eq!(latency_score(0.0), 1.0);
        assert_eq!(latency_score(250.0), 1.0);
        assert_eq!(latency_score(1000.0), 1.0);
        assert!((latency_score(4000.0) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn throughput_scores_are_normalised() {
        // 5 requests in 2500ms is exactly the normalisation rate.
        assert!((throughput_score(5, 2500.0) - 1.0).abs() < 1e-9);
        assert!((throughput_score(5, 5000.0) - 0.5).abs() < 1e-9);
        assert_eq!(throughput_score(5, 10.0), 1.0);
        assert_eq!(throughput_score(5, 0.0), 1.0);
    }
}
