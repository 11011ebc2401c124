//! Concurrent URI dereferencing for Linked Data quality metrics.
//!
//! A [`DereferencePool`] drains a queue of URIs with a fixed set of OS
//! threads, records every redirect hop of each fetch, and commits one
//! immutable [`FetchOutcome`] per URI into a shared [`CacheService`].
//! Metrics poll the cache through [`drain`] and hand outcomes to the
//! [`Classifier`], which applies the Linked Data dereferencing rules.

pub mod cache;
pub mod classify;
pub mod drain;
pub mod errors;
pub mod fetcher;
pub mod model;
pub mod options;
pub mod pool;

pub use cache::{CacheService, DEFAULT_CACHE_CAPACITY, HTTP_RESOURCE_CACHE, VOCABULARY_CACHE};
pub use classify::{Classifier, DereferenceCode, Verdict, classify, has_ok_status};
pub use drain::{DrainReport, drain};
pub use errors::{DerefError, Result};
pub use fetcher::HttpFetcher;
pub use model::{ContentIssue, FetchFailure, FetchOutcome, Hop};
pub use options::{DerefOptions, RetryPolicy};
pub use pool::DereferencePool;
