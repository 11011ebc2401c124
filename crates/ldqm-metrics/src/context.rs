use std::sync::Arc;

use ldqm_deref::{
    CacheService, Classifier, DereferencePool, DrainReport, HttpFetcher, RetryPolicy, Verdict,
    drain,
};
use tracing::info;

use crate::config::AssessmentConfig;
use crate::errors::Result;
use crate::metric::{ProblemItem, ProblemKind};

/// Dereferencing services shared by the metrics of one assessment: a single
/// worker pool over a single cache service, the retry policy and the
/// classifier.
pub struct DerefContext {
    pool: DereferencePool,
    retry: RetryPolicy,
    classifier: Classifier,
}

/// Verdict counts over a set of URIs.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub assessed: u64,
    pub valid: u64,
    pub problems: Vec<ProblemItem>,
}

impl Evaluation {
    pub fn ratio(&self) -> f64 {
        if self.assessed == 0 {
            return 0.0;
        }
        self.valid as f64 / self.assessed as f64
    }

    /// Folds the counts of a later batch into this one.
    pub fn merge(&mut self, other: Evaluation) {
        self.assessed += other.assessed;
        self.valid += other.valid;
        self.problems.extend(other.problems);
    }
}

impl DerefContext {
    pub fn new(config: &AssessmentConfig) -> Result<Arc<Self>> {
        let cache = Arc::new(CacheService::for_assessment(config.deref.cache_capacity)?);
        Self::with_cache(config, cache)
    }

    /// Context over an existing cache service, e.g. one shared with other
    /// assessments.
    pub fn with_cache(config: &AssessmentConfig, cache: Arc<CacheService>) -> Result<Arc<Self>> {
        config.validate()?;
        let pool = DereferencePool::new(&config.deref, cache)?;
        Ok(Arc::new(Self {
            pool,
            retry: config.retry.clone(),
            classifier: Classifier::default(),
        }))
    }

    pub fn pool(&self) -> &DereferencePool {
        &self.pool
    }

    pub fn cache(&self) -> &Arc<CacheService> {
        self.pool.cache()
    }

    pub fn fetcher(&self) -> &HttpFetcher {
        self.pool.fetcher()
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn drain<I, S>(&self, uris: I) -> Result<DrainReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(drain(&self.pool, uris, &self.retry)?)
    }

    /// Dereferences `uris` and classifies every outcome. URIs left pending
    /// by the retry policy are counted as invalid.
    pub fn evaluate<I, S>(&self, uris: I) -> Result<Evaluation>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let report = self.drain(uris)?;
        let mut evaluation = Evaluation {
            assessed: report.assessed() as u64,
            ..Evaluation::default()
        };

        for (uri, outcome) in &report.resolved {
            let (verdict, code) = self.classifier.assess(outcome);
            if verdict == Verdict::Valid {
                evaluation.valid += 1;
            } else {
                evaluation.problems.push(
                    ProblemItem::new(uri.as_str(), ProblemKind::Dereferenceability(code))
                        .with_detail(outcome.status_line()),
                );
            }
        }
        for uri in &report.unresolved {
            evaluation
                .problems
                .push(ProblemItem::new(uri.as_str(), ProblemKind::Unresolved));
        }

        info!(
            assessed = evaluation.assessed,
            valid = evaluation.valid,
            unresolved = report.unresolved.len(),
            "dereferenceability evaluated"
        );
        Ok(evaluation)
    }
}
