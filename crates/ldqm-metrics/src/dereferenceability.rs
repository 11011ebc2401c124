use std::collections::BTreeMap;
use std::sync::Arc;

use ldqm_core::Statement;
use ldqm_sampling::{HybridSet, ReservoirSampler, SpillableSet};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::config::AssessmentConfig;
use crate::context::{DerefContext, Evaluation};
use crate::errors::{MetricError, Result};
use crate::metric::{ProblemItem, QualityMetric, candidate_uris};

const ESTIMATE_STREAM: u64 = 1;

/// Share of the distinct subject and object URIs that dereference according
/// to the Linked Data rules. Statements declaring `rdf:type` are skipped.
pub struct Dereferenceability {
    context: Arc<DerefContext>,
    seen: HybridSet,
    batch_size: usize,
    triples_assessed: u64,
    evaluation: Option<Evaluation>,
}

impl Dereferenceability {
    pub fn new(context: Arc<DerefContext>, config: &AssessmentConfig) -> Result<Self> {
        Ok(Self {
            context,
            seen: HybridSet::in_temp_dir(config.spill_threshold)?,
            batch_size: config.deref.cache_capacity,
            triples_assessed: 0,
            evaluation: None,
        })
    }
}

impl QualityMetric for Dereferenceability {
    fn name(&self) -> &'static str {
        "dereferenceability"
    }

    fn compute(&mut self, statement: &Statement) -> Result<()> {
        if statement.is_type_declaration() {
            return Ok(());
        }
        self.triples_assessed += 1;
        for uri in candidate_uris(statement) {
            self.seen.insert(uri)?;
        }
        Ok(())
    }

    /// URIs are read back from the set in batches no larger than the result
    /// cache, so outcomes are collected before they can be evicted.
    fn metric_value(&mut self) -> Result<f64> {
        if self.evaluation.is_none() {
            debug!(
                uris = self.seen.len(),
                spilled = self.seen.is_spilled(),
                "assessing dereferenceability"
            );
            let context = &self.context;
            let mut evaluation = Evaluation::default();
            self.seen.for_each_batch(self.batch_size, |batch| {
                evaluation.merge(context.evaluate(batch)?);
                Ok::<(), MetricError>(())
            })?;
            self.evaluation = Some(evaluation);
        }
        Ok(self.evaluation.as_ref().map_or(0.0, Evaluation::ratio))
    }

    fn problems(&self) -> &[ProblemItem] {
        self.evaluation
            .as_ref()
            .map_or(&[], |evaluation| evaluation.problems.as_slice())
    }

    fn counters(&self) -> BTreeMap<&'static str, u64> {
        let mut counters = BTreeMap::from([
            ("triples_assessed", self.triples_assessed),
            ("distinct_uris", self.seen.len()),
        ]);
        if let Some(evaluation) = &self.evaluation {
            counters.insert("uris_assessed", evaluation.assessed);
            counters.insert("valid_uris", evaluation.valid);
        }
        counters
    }
}

/// Dereferenceability over a uniform sample of the distinct URIs, so the
/// number of requests stays bounded on large datasets.
pub struct EstimatedDereferenceability {
    context: Arc<DerefContext>,
    sampler: ReservoirSampler<String, ChaCha8Rng>,
    triples_assessed: u64,
    evaluation: Option<Evaluation>,
}

impl EstimatedDereferenceability {
    pub fn new(context: Arc<DerefContext>, config: &AssessmentConfig) -> Result<Self> {
        let sampler = ReservoirSampler::with_rng(
            config.sampling.reservoir_size,
            true,
            config.rng(ESTIMATE_STREAM),
        )?;
        Ok(Self {
            context,
            sampler,
            triples_assessed: 0,
            evaluation: None,
        })
    }

    pub fn sample(&self) -> Vec<String> {
        self.sampler.items()
    }
}

impl QualityMetric for EstimatedDereferenceability {
    fn name(&self) -> &'static str {
        "estimated_dereferenceability"
    }

    fn compute(&mut self, statement: &Statement) -> Result<()> {
        if statement.is_type_declaration() {
            return Ok(());
        }
        self.triples_assessed += 1;
        for uri in candidate_uris(statement) {
            self.sampler.add_if_absent(uri.to_string());
        }
        Ok(())
    }

    fn metric_value(&mut self) -> Result<f64> {
        if self.evaluation.is_none() {
            let sample = self.sampler.items();
            debug!(
                sampled = sample.len(),
                seen = self.sampler.seen(),
                "assessing sampled dereferenceability"
            );
            self.evaluation = Some(self.context.evaluate(&sample)?);
        }
        Ok(self.evaluation.as_ref().map_or(0.0, Evaluation::ratio))
    }

    fn is_estimate(&self) -> bool {
        true
    }

    fn problems(&self) -> &[ProblemItem] {
        self.evaluation
            .as_ref()
            .map_or(&[], |evaluation| evaluation.problems.as_slice())
    }

    fn counters(&self) -> BTreeMap<&'static str, u64> {
        let mut counters = BTreeMap::from([
            ("triples_assessed", self.triples_assessed),
            ("uris_offered", self.sampler.seen()),
            ("sample_size", self.sampler.size() as u64),
        ]);
        if let Some(evaluation) = &self.evaluation {
            counters.insert("valid_uris", evaluation.valid);
        }
        counters
    }
}
