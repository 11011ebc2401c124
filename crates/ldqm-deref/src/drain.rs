use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::classify::{Classifier, Verdict};
use crate::errors::Result;
use crate::model::FetchOutcome;
use crate::options::RetryPolicy;
use crate::pool::DereferencePool;

/// Result of one bounded drain.
#[derive(Debug, Clone, Default)]
pub struct DrainReport {
    /// Committed outcomes in submission order.
    pub resolved: Vec<(String, Arc<FetchOutcome>)>,
    /// URIs still pending when the policy cut the drain off.
    pub unresolved: Vec<String>,
    pub rounds: u32,
    pub elapsed: Duration,
}

impl DrainReport {
    /// Every submitted URI reached a committed outcome.
    pub fn converged(&self) -> bool {
        self.unresolved.is_empty()
    }

    pub fn assessed(&self) -> usize {
        self.resolved.len() + self.unresolved.len()
    }

    /// Number of resolved outcomes judged valid.
    pub fn valid_count(&self, classifier: &Classifier) -> usize {
        self.resolved
            .iter()
            .filter(|(_, outcome)| classifier.verdict(Some(&**outcome)) == Verdict::Valid)
            .count()
    }

    /// Valid outcomes over every submitted URI. Unresolved URIs count as
    /// failures. Zero when nothing was submitted.
    pub fn valid_fraction(&self, classifier: &Classifier) -> f64 {
        let assessed = self.assessed();
        if assessed == 0 {
            return 0.0;
        }
        self.valid_count(classifier) as f64 / assessed as f64
    }
}

/// Submits `uris`, then polls the cache and resubmits whatever is still
/// missing until everything is committed or `policy` runs out.
///
/// Only rounds in which the pending set did not shrink count against
/// `policy.max_rounds`; `policy.max_elapsed_ms` caps the whole drain.
/// Outcomes evicted from the cache before they were collected are fetched
/// again on the next round.
pub fn drain<I, S>(pool: &DereferencePool, uris: I, policy: &RetryPolicy) -> Result<DrainReport>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let start = Instant::now();
    let mut seen = HashSet::new();
    let mut outstanding: Vec<String> = uris
        .into_iter()
        .map(|uri| uri.as_ref().to_string())
        .filter(|uri| seen.insert(uri.clone()))
        .collect();
    let order: Vec<String> = outstanding.clone();

    let submitted = pool.enqueue_all(&outstanding);
    pool.start(false)?;
    info!(uris = outstanding.len(), submitted, "drain started");

    let mut collected: Vec<(String, Arc<FetchOutcome>)> = Vec::with_capacity(outstanding.len());
    let mut rounds = 0u32;
    let mut stalled = 0u32;
    let mut last_pending = outstanding.len();

    loop {
        outstanding.retain(|uri| match pool.cache().outcome(uri) {
            Some(outcome) => {
                collected.push((uri.clone(), outcome));
                false
            }
            None => true,
        });

        if outstanding.is_empty() {
            break;
        }

        if rounds > 0 {
            if outstanding.len() < last_pending {
                stalled = 0;
            } else {
                stalled += 1;
            }
        }
        last_pending = outstanding.len();

        let over_budget = policy
            .max_elapsed()
            .is_some_and(|budget| start.elapsed() >= budget);
        if stalled >= policy.max_rounds || over_budget {
            warn!(
                round = rounds,
                stalled,
                pending = outstanding.len(),
                "drain cut off with uris still pending"
            );
            break;
        }

        rounds += 1;
        let resubmitted = pool.enqueue_all(&outstanding);
        debug!(round = rounds, pending = outstanding.len(), resubmitted, "drain round");
        thread::sleep(policy.poll_interval());
    }

    let mut by_uri: HashMap<String, Arc<FetchOutcome>> = collected.into_iter().collect();
    let resolved = order
        .into_iter()
        .filter_map(|uri| by_uri.remove(&uri).map(|outcome| (uri, outcome)))
        .collect::<Vec<_>>();

    let report = DrainReport {
        resolved,
        unresolved: outstanding,
        rounds,
        elapsed: start.elapsed(),
    };
    info!(
        resolved = report.resolved.len(),
        unresolved = report.unresolved.len(),
        rounds = report.rounds,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "drain finished"
    );
    Ok(report)
}
