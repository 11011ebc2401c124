use std::collections::{BTreeMap, BTreeSet};

use ldqm_core::Statement;
use ldqm_sampling::LoadBalancedBloomFilter;
use tracing::{debug, trace};

use crate::config::AssessmentConfig;
use crate::errors::Result;
use crate::metric::{ProblemItem, ProblemKind, QualityMetric};

const FILTER_STREAM: u64 = 2;

/// Estimated share of instances whose description is not a replica of an
/// earlier instance.
///
/// Consecutive statements with the same subject form one instance. Its
/// sorted predicate-object pairs are checked against a load-balanced bloom
/// filter; a hit counts as a duplicate. Input is expected grouped by subject,
/// as N-Triples dumps usually are.
pub struct EstimatedExtensionalConciseness {
    filter: LoadBalancedBloomFilter,
    current_subject: Option<String>,
    current_description: BTreeSet<String>,
    instances: u64,
    duplicates: u64,
    triples: u64,
    problems: Vec<ProblemItem>,
}

impl EstimatedExtensionalConciseness {
    pub fn new(config: &AssessmentConfig) -> Result<Self> {
        let sampling = &config.sampling;
        let mut rng = config.rng(FILTER_STREAM);
        let filter = LoadBalancedBloomFilter::with_rng(
            sampling.filter_count,
            sampling.expected_items,
            sampling.false_positive_rate,
            &mut rng,
        )?;
        Ok(Self::with_filter(filter))
    }

    pub fn with_filter(filter: LoadBalancedBloomFilter) -> Self {
        Self {
            filter,
            current_subject: None,
            current_description: BTreeSet::new(),
            instances: 0,
            duplicates: 0,
            triples: 0,
            problems: Vec::new(),
        }
    }

    pub fn instances(&self) -> u64 {
        self.instances
    }

    pub fn estimated_duplicates(&self) -> u64 {
        self.duplicates
    }

    fn finish_instance(&mut self) {
        let Some(subject) = self.current_subject.take() else {
            return;
        };
        let description = std::mem::take(&mut self.current_description)
            .into_iter()
            .collect::<Vec<_>>()
            .join("\n");

        if self.filter.check_duplicate(&description) {
            self.duplicates += 1;
            debug!(subject = %subject, "duplicate instance description");
            self.problems
                .push(ProblemItem::new(subject, ProblemKind::ResourceReplica));
        }
    }
}

impl QualityMetric for EstimatedExtensionalConciseness {
    fn name(&self) -> &'static str {
        "estimated_extensional_conciseness"
    }

    fn compute(&mut self, statement: &Statement) -> Result<()> {
        self.triples += 1;
        let subject = statement.subject.token();
        if self.current_subject.as_deref() != Some(subject.as_str()) {
            self.finish_instance();
            trace!(subject = %subject, "new instance");
            self.current_subject = Some(subject);
            self.instances += 1;
        }
        self.current_description
            .insert(format!("{} {}", statement.predicate, statement.object.token()));
        Ok(())
    }

    /// One when no instance was seen.
    fn metric_value(&mut self) -> Result<f64> {
        self.finish_instance();
        if self.instances == 0 {
            return Ok(1.0);
        }
        Ok((self.instances - self.duplicates) as f64 / self.instances as f64)
    }

    fn is_estimate(&self) -> bool {
        true
    }

    fn problems(&self) -> &[ProblemItem] {
        &self.problems
    }

    fn counters(&self) -> BTreeMap<&'static str, u64> {
        BTreeMap::from([
            ("triples_assessed", self.triples),
            ("instances", self.instances),
            ("estimated_duplicates", self.duplicates),
            ("filter_count", self.filter.filter_count() as u64),
            ("bits_per_filter", self.filter.bits_per_filter()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldqm_core::Node;

    fn metric() -> EstimatedExtensionalConciseness {
        let filter = LoadBalancedBloomFilter::seeded(4, 1_000, 0.001, 11).expect("filter");
        EstimatedExtensionalConciseness::with_filter(filter)
    }

    fn triple(subject: &str, predicate: &str, object: &str) -> Statement {
        Statement::new(
            Node::iri(subject),
            predicate,
            Node::literal(object),
        )
    }

    #[test]
    fn replicated_instance_is_counted_once() {
        let mut metric = metric();
        let input = [
            triple("http://ex.org/a", "http://ex.org/name", "Alice"),
            triple("http://ex.org/a", "http://ex.org/age", "30"),
            triple("http://ex.org/b", "http://ex.org/name", "Bob"),
            // Same description as "a", statements in another order.
            triple("http://ex.org/c", "http://ex.org/age", "30"),
            triple("http://ex.org/c", "http://ex.org/name", "Alice"),
        ];
        for statement in &input {
            metric.compute(statement).expect("compute");
        }

        let value = metric.metric_value().expect("value");
        assert_eq!(metric.instances(), 3);
        assert_eq!(metric.estimated_duplicates(), 1);
        assert!((value - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(metric.problems()[0].resource, "http://ex.org/c");

        // Idempotent once flushed.
        assert_eq!(metric.metric_value().expect("value"), value);
    }

    #[test]
    fn subset_descriptions_are_not_duplicates() {
        let mut metric = metric();
        for statement in [
            triple("http://ex.org/a", "http://ex.org/name", "Alice"),
            triple("http://ex.org/a", "http://ex.org/age", "30"),
            triple("http://ex.org/b", "http://ex.org/name", "Alice"),
        ] {
            metric.compute(&statement).expect("compute");
        }
        assert_eq!(metric.metric_value().expect("value"), 1.0);
    }

    #[test]
    fn empty_input_is_fully_concise() {
        assert_eq!(metric().metric_value().expect("value"), 1.0);
    }
}
