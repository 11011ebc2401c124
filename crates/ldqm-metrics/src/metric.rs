use std::collections::BTreeMap;

use ldqm_core::{Statement, is_possible_url};
use ldqm_deref::DereferenceCode;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// A quality metric fed one statement at a time.
pub trait QualityMetric {
    fn name(&self) -> &'static str;

    fn compute(&mut self, statement: &Statement) -> Result<()>;

    /// Final value, a ratio in `[0, 1]` unless the metric says otherwise.
    /// Work deferred until the stream ends (network assessment, flushing
    /// buffered state) happens on the first call; later calls return the
    /// same value.
    fn metric_value(&mut self) -> Result<f64>;

    fn is_estimate(&self) -> bool {
        false
    }

    /// Problems found so far. Complete only after `metric_value`.
    fn problems(&self) -> &[ProblemItem] {
        &[]
    }

    /// Named counts describing what was assessed.
    fn counters(&self) -> BTreeMap<&'static str, u64> {
        BTreeMap::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "code", rename_all = "snake_case")]
pub enum ProblemKind {
    /// URI dereferenced but failed the Linked Data rules.
    Dereferenceability(DereferenceCode),
    /// URI never reached a committed outcome before the drain was cut off.
    Unresolved,
    /// Instance whose description duplicates an earlier one.
    ResourceReplica,
    MisreportedContentType,
    /// External link whose target does not serve RDF.
    NoRdfForExternalLink,
}

/// One problem attached to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemItem {
    pub resource: String,
    pub kind: ProblemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProblemItem {
    pub fn new(resource: impl Into<String>, kind: ProblemKind) -> Self {
        Self {
            resource: resource.into(),
            kind,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Serializable summary of a finished metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricReport {
    pub metric: String,
    pub value: f64,
    pub estimate: bool,
    pub counters: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<ProblemItem>,
}

impl MetricReport {
    pub fn collect(metric: &mut dyn QualityMetric) -> Result<Self> {
        let value = metric.metric_value()?;
        Ok(Self {
            metric: metric.name().to_string(),
            value,
            estimate: metric.is_estimate(),
            counters: metric
                .counters()
                .into_iter()
                .map(|(key, count)| (key.to_string(), count))
                .collect(),
            problems: metric.problems().to_vec(),
        })
    }
}

/// Subject and object tokens of `statement` worth dereferencing.
pub(crate) fn candidate_uris(statement: &Statement) -> impl Iterator<Item = &str> {
    [statement.subject.as_iri(), statement.object.as_iri()]
        .into_iter()
        .flatten()
        .filter(|uri| is_possible_url(uri))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldqm_core::Node;

    #[test]
    fn candidates_skip_literals_and_blank_nodes() {
        let statement = Statement::new(
            Node::iri("http://example.org/s"),
            "http://example.org/p",
            Node::literal("http://example.org/not-a-link"),
        );
        let uris: Vec<&str> = candidate_uris(&statement).collect();
        assert_eq!(uris, vec!["http://example.org/s"]);

        let blank = Statement::new(
            Node::blank("b1"),
            "http://example.org/p",
            Node::iri("mailto:someone@example.org"),
        );
        assert_eq!(candidate_uris(&blank).count(), 0);
    }

    #[test]
    fn problem_items_serialize_with_codes() {
        let item = ProblemItem::new(
            "http://example.org/x",
            ProblemKind::Dereferenceability(DereferenceCode::Sc4xx),
        );
        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["kind"]["kind"], "dereferenceability");
        assert_eq!(json["kind"]["code"], "sc4xx");
        assert!(json.get("detail").is_none());
    }
}
