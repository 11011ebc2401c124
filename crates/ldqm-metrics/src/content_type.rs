use std::collections::BTreeMap;
use std::sync::Arc;

use ldqm_core::{RdfLang, Statement};
use ldqm_deref::{DrainReport, FetchOutcome, has_ok_status};
use ldqm_sampling::{HybridSet, SpillableSet};
use tracing::{debug, info};

use crate::config::AssessmentConfig;
use crate::context::DerefContext;
use crate::errors::{MetricError, Result};
use crate::metric::{ProblemItem, ProblemKind, QualityMetric, candidate_uris};

/// How a successfully dereferenced resource reported its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentTypeCheck {
    /// RDF media type and the body is readable as such.
    Correct,
    /// RDF media type but no usable RDF body.
    UnparsableRdf { reported: String },
    /// Non-RDF media type for a resource whose location names an RDF file.
    NotAdvertised {
        reported: Option<String>,
        expected: RdfLang,
    },
    /// Nothing suggests RDF content; not counted.
    NotRdf,
}

/// Compares the reported content type of a `200` outcome with what the
/// content and its location imply.
pub fn check_content_type(outcome: &FetchOutcome) -> ContentTypeCheck {
    let reported = outcome.content_type.clone();
    match reported.as_deref().and_then(RdfLang::from_content_type) {
        Some(_) if outcome.parsable => ContentTypeCheck::Correct,
        Some(_) => ContentTypeCheck::UnparsableRdf {
            reported: reported.unwrap_or_default(),
        },
        None => match RdfLang::from_filename(&outcome.final_url) {
            Some(expected) => ContentTypeCheck::NotAdvertised { reported, expected },
            None => ContentTypeCheck::NotRdf,
        },
    }
}

/// Share of RDF resources whose `Content-Type` header tells the truth.
pub struct MisreportedContentType {
    context: Arc<DerefContext>,
    seen: HybridSet,
    batch_size: usize,
    triples: u64,
    correct: u64,
    misreported: u64,
    assessed: bool,
    problems: Vec<ProblemItem>,
}

impl MisreportedContentType {
    pub fn new(context: Arc<DerefContext>, config: &AssessmentConfig) -> Result<Self> {
        Ok(Self {
            context,
            seen: HybridSet::in_temp_dir(config.spill_threshold)?,
            batch_size: config.deref.cache_capacity,
            triples: 0,
            correct: 0,
            misreported: 0,
            assessed: false,
            problems: Vec::new(),
        })
    }

    fn assess(&mut self) -> Result<()> {
        let context = &self.context;
        let mut tally = Tally::default();
        self.seen.for_each_batch(self.batch_size, |batch| {
            tally.record(&context.drain(batch)?);
            Ok::<(), MetricError>(())
        })?;

        info!(
            correct = tally.correct,
            misreported = tally.misreported,
            unresolved = tally.unresolved,
            "content types checked"
        );
        self.correct = tally.correct;
        self.misreported = tally.misreported;
        self.problems = tally.problems;
        Ok(())
    }
}

#[derive(Default)]
struct Tally {
    correct: u64,
    misreported: u64,
    unresolved: usize,
    problems: Vec<ProblemItem>,
}

impl Tally {
    fn record(&mut self, report: &DrainReport) {
        self.unresolved += report.unresolved.len();
        for (uri, outcome) in &report.resolved {
            if !has_ok_status(outcome) {
                continue;
            }
            match check_content_type(outcome) {
                ContentTypeCheck::Correct => self.correct += 1,
                ContentTypeCheck::UnparsableRdf { reported } => {
                    self.misreported += 1;
                    self.problems.push(
                        ProblemItem::new(uri.as_str(), ProblemKind::MisreportedContentType)
                            .with_detail(format!("reported {reported}, content is not parsable")),
                    );
                }
                ContentTypeCheck::NotAdvertised { reported, expected } => {
                    self.misreported += 1;
                    let reported = reported.unwrap_or_else(|| "nothing".to_string());
                    self.problems.push(
                        ProblemItem::new(uri.as_str(), ProblemKind::MisreportedContentType)
                            .with_detail(format!(
                                "reported {reported}, expected {}",
                                expected.media_type()
                            )),
                    );
                }
                ContentTypeCheck::NotRdf => {
                    debug!(uri = %uri, "no rdf content expected");
                }
            }
        }
    }
}

impl QualityMetric for MisreportedContentType {
    fn name(&self) -> &'static str {
        "misreported_content_type"
    }

    fn compute(&mut self, statement: &Statement) -> Result<()> {
        self.triples += 1;
        for uri in candidate_uris(statement) {
            self.seen.insert(uri)?;
        }
        Ok(())
    }

    /// Zero when no RDF resource was found.
    fn metric_value(&mut self) -> Result<f64> {
        if !self.assessed {
            self.assess()?;
            self.assessed = true;
        }
        let checked = self.correct + self.misreported;
        if checked == 0 {
            return Ok(0.0);
        }
        Ok(self.correct as f64 / checked as f64)
    }

    fn problems(&self) -> &[ProblemItem] {
        &self.problems
    }

    fn counters(&self) -> BTreeMap<&'static str, u64> {
        BTreeMap::from([
            ("triples_assessed", self.triples),
            ("distinct_uris", self.seen.len()),
            ("resources_checked", self.correct + self.misreported),
            ("correct_content_type", self.correct),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ldqm_deref::Hop;

    fn ok_outcome(url: &str, content_type: Option<&str>, parsable: bool) -> FetchOutcome {
        FetchOutcome {
            uri: url.to_string(),
            hops: vec![Hop::new(200, None)],
            final_url: url.to_string(),
            content_type: content_type.map(str::to_string),
            parsable,
            failure: None,
            content_issue: None,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn rdf_media_type_with_content_is_correct() {
        let outcome = ok_outcome("http://ex.org/r", Some("text/turtle"), true);
        assert_eq!(check_content_type(&outcome), ContentTypeCheck::Correct);
    }

    #[test]
    fn rdf_file_served_as_text_is_misreported() {
        let outcome = ok_outcome("http://ex.org/dump.ttl", Some("text/plain"), true);
        assert_eq!(
            check_content_type(&outcome),
            ContentTypeCheck::NotAdvertised {
                reported: Some("text/plain".to_string()),
                expected: RdfLang::Turtle,
            }
        );
    }

    #[test]
    fn html_pages_are_ignored() {
        let outcome = ok_outcome("http://ex.org/about", Some("text/html"), false);
        assert_eq!(check_content_type(&outcome), ContentTypeCheck::NotRdf);
    }

    #[test]
    fn empty_rdf_body_is_misreported() {
        let outcome = ok_outcome("http://ex.org/r", Some("application/rdf+xml"), false);
        assert!(matches!(
            check_content_type(&outcome),
            ContentTypeCheck::UnparsableRdf { .. }
        ));
    }
}
