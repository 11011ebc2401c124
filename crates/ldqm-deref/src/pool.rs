use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::cache::CacheService;
use crate::errors::Result;
use crate::fetcher::HttpFetcher;
use crate::options::DerefOptions;

#[derive(Default)]
struct WorkQueue {
    pending: VecDeque<String>,
    queued: HashSet<String>,
    in_flight: HashSet<String>,
}

impl WorkQueue {
    fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_empty()
    }
}

struct PoolShared {
    cache: Arc<CacheService>,
    fetcher: HttpFetcher,
    queue: Mutex<WorkQueue>,
    available: Condvar,
    idle: Condvar,
    stop: AtomicBool,
}

impl PoolShared {
    fn queue(&self) -> MutexGuard<'_, WorkQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed set of worker threads that dereference queued URIs and commit the
/// outcomes to the shared cache.
///
/// A URI is never fetched twice concurrently: enqueueing is a no-op while the
/// URI is queued, in flight, or already cached.
pub struct DereferencePool {
    shared: Arc<PoolShared>,
    worker_count: usize,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl DereferencePool {
    pub fn new(options: &DerefOptions, cache: Arc<CacheService>) -> Result<Self> {
        let fetcher = HttpFetcher::new(options)?;
        Ok(Self {
            shared: Arc::new(PoolShared {
                cache,
                fetcher,
                queue: Mutex::new(WorkQueue::default()),
                available: Condvar::new(),
                idle: Condvar::new(),
                stop: AtomicBool::new(false),
            }),
            worker_count: options.workers,
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Queues `uri` for dereferencing. Returns false when it is already
    /// cached, queued or being fetched.
    pub fn enqueue(&self, uri: &str) -> bool {
        if self.shared.cache.has_outcome(uri) {
            return false;
        }

        let mut queue = self.shared.queue();
        if queue.queued.contains(uri) || queue.in_flight.contains(uri) {
            return false;
        }
        queue.queued.insert(uri.to_string());
        queue.pending.push_back(uri.to_string());
        drop(queue);

        self.shared.available.notify_one();
        true
    }

    /// Queues every URI, returning how many were actually added.
    pub fn enqueue_all<I, S>(&self, uris: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        uris.into_iter()
            .filter(|uri| self.enqueue(uri.as_ref()))
            .count()
    }

    /// Spawns the workers if they are not running yet. With `blocking` the
    /// call returns once the queue is empty and nothing is in flight.
    pub fn start(&self, blocking: bool) -> Result<()> {
        {
            let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
            if workers.is_empty() {
                self.shared.stop.store(false, Ordering::SeqCst);
                for index in 0..self.worker_count {
                    let shared = Arc::clone(&self.shared);
                    let handle = thread::Builder::new()
                        .name(format!("deref-worker-{index}"))
                        .spawn(move || worker_loop(&shared))?;
                    workers.push(handle);
                }
                info!(workers = self.worker_count, "dereference pool started");
            }
        }

        if blocking {
            self.wait_idle();
        }
        Ok(())
    }

    /// Blocks until the queue is empty and no fetch is in flight.
    pub fn wait_idle(&self) {
        let queue = self.shared.queue();
        let _idle = self
            .shared
            .idle
            .wait_while(queue, |queue| !queue.is_idle())
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Signals the workers to exit and joins them. Queued URIs that were not
    /// picked up stay unfetched. Safe to call more than once.
    pub fn stop(&self) {
        {
            // Taken under the queue lock so a worker cannot miss the wakeup.
            let _queue = self.shared.queue();
            self.shared.stop.store(true, Ordering::SeqCst);
        }
        self.shared.available.notify_all();

        let handles: Vec<JoinHandle<()>> = {
            let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
            workers.drain(..).collect()
        };
        if handles.is_empty() {
            return;
        }

        for handle in handles {
            if handle.join().is_err() {
                warn!("dereference worker panicked");
            }
        }

        let mut queue = self.shared.queue();
        let dropped = queue.pending.len();
        queue.pending.clear();
        queue.queued.clear();
        drop(queue);
        self.shared.idle.notify_all();
        info!(dropped, "dereference pool stopped");
    }

    pub fn cache(&self) -> &Arc<CacheService> {
        &self.shared.cache
    }

    pub fn fetcher(&self) -> &HttpFetcher {
        &self.shared.fetcher
    }

    /// URIs queued or in flight.
    pub fn pending_count(&self) -> usize {
        let queue = self.shared.queue();
        queue.pending.len() + queue.in_flight.len()
    }

    pub fn is_running(&self) -> bool {
        !self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl Drop for DereferencePool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(shared: &PoolShared) {
    loop {
        let uri = {
            let mut queue = shared.queue();
            loop {
                if shared.stop.load(Ordering::SeqCst) {
                    return;
                }
                if let Some(uri) = queue.pending.pop_front() {
                    queue.queued.remove(&uri);
                    queue.in_flight.insert(uri.clone());
                    break uri;
                }
                queue = shared
                    .available
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        if !shared.cache.has_outcome(&uri) {
            let outcome = shared.fetcher.fetch(&uri);
            debug!(uri = %uri, status = %outcome.status_line(), "dereferenced");
            if let Err(err) = shared.cache.put_outcome(outcome) {
                warn!(uri = %uri, error = %err, "failed to commit outcome");
            }
        }

        let mut queue = shared.queue();
        queue.in_flight.remove(&uri);
        if queue.is_idle() {
            shared.idle.notify_all();
        }
    }
}
