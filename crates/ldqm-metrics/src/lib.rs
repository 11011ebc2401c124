//! Linked Data quality metrics built on the dereferencing engine and the
//! bounded-memory samplers.
//!
//! Metrics consume [`Statement`](ldqm_core::Statement)s one at a time through
//! [`QualityMetric::compute`] and produce their value on demand. Metrics
//! that dereference URIs share one [`DerefContext`], so a URI fetched for
//! one metric is served from the cache for the others.

pub mod conciseness;
pub mod config;
pub mod content_type;
pub mod context;
pub mod dereferenceability;
pub mod errors;
pub mod links;
pub mod metric;
pub mod performance;

pub use conciseness::EstimatedExtensionalConciseness;
pub use config::{AssessmentConfig, SamplingConfig};
pub use content_type::{ContentTypeCheck, MisreportedContentType, check_content_type};
pub use context::{DerefContext, Evaluation};
pub use dereferenceability::{Dereferenceability, EstimatedDereferenceability};
pub use errors::{MetricError, Result};
pub use links::EstimatedLinkExternalDataProviders;
pub use metric::{MetricReport, ProblemItem, ProblemKind, QualityMetric};
pub use performance::{
    HighThroughput, LowLatency, NORM_SERVED_REQS_PER_MILLISEC, NORM_TOTAL_RESPONSE_TIME_MS,
    latency_score, throughput_score,
};
