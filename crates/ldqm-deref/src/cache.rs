use std::any::Any;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use lru::LruCache;
use tracing::{debug, trace};

use crate::errors::{DerefError, Result};
use crate::model::FetchOutcome;

/// Cache of fetch outcomes, keyed by the requested URI.
pub const HTTP_RESOURCE_CACHE: &str = "http_resource_cache";
/// Cache of vocabulary terms looked up by metrics.
pub const VOCABULARY_CACHE: &str = "vocabulary_cache";
pub const DEFAULT_CACHE_CAPACITY: usize = 5_000;

type Entry = Arc<dyn Any + Send + Sync>;
type NamedCache = Arc<Mutex<LruCache<String, Entry>>>;

/// Named, independently bounded LRU caches shared by the worker pool and
/// the metrics of one assessment run.
///
/// Entries are write-once: a `put` on an existing key is ignored, so a
/// reader either sees the committed value or nothing. Eviction is the only
/// way an entry disappears.
#[derive(Default)]
pub struct CacheService {
    caches: RwLock<HashMap<String, NamedCache>>,
}

impl CacheService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service with the HTTP resource and vocabulary caches created.
    pub fn for_assessment(capacity: usize) -> Result<Self> {
        let service = Self::new();
        service.create_cache(HTTP_RESOURCE_CACHE, capacity)?;
        service.create_cache(VOCABULARY_CACHE, capacity)?;
        Ok(service)
    }

    /// Creates a named cache. Creating an existing cache keeps the original.
    pub fn create_cache(&self, name: &str, capacity: usize) -> Result<()> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            DerefError::InvalidOptions(format!("cache '{name}' needs a positive capacity"))
        })?;

        let mut caches = self.caches.write().unwrap_or_else(PoisonError::into_inner);
        caches
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(LruCache::new(capacity))));
        debug!(cache = name, capacity = capacity.get(), "cache ready");
        Ok(())
    }

    /// Stores `value` under `key`. Returns false when the key already held an
    /// entry, which is left untouched.
    pub fn put<V: Any + Send + Sync>(&self, name: &str, key: &str, value: V) -> Result<bool> {
        self.put_arc(name, key, Arc::new(value))
    }

    pub fn put_arc<V: Any + Send + Sync>(&self, name: &str, key: &str, value: Arc<V>) -> Result<bool> {
        let cache = self
            .named(name)
            .ok_or_else(|| DerefError::UnknownCache(name.to_string()))?;
        let mut cache = lock(&cache);
        if cache.contains(key) {
            return Ok(false);
        }

        if let Some((evicted, _)) = cache.push(key.to_string(), value as Entry) {
            trace!(cache = name, key = %evicted, "evicted least recently used entry");
        }
        Ok(true)
    }

    /// Looks up `key` and marks it as recently used. Absent when the key was
    /// never stored, was evicted, or holds a value of another type.
    pub fn get<V: Any + Send + Sync>(&self, name: &str, key: &str) -> Option<Arc<V>> {
        let cache = self.named(name)?;
        let entry = lock(&cache).get(key).cloned()?;
        entry.downcast::<V>().ok()
    }

    /// Membership test that leaves recency untouched.
    pub fn exists(&self, name: &str, key: &str) -> bool {
        self.named(name)
            .is_some_and(|cache| lock(&cache).contains(key))
    }

    pub fn len(&self, name: &str) -> usize {
        self.named(name).map_or(0, |cache| lock(&cache).len())
    }

    pub fn capacity(&self, name: &str) -> Option<usize> {
        self.named(name).map(|cache| lock(&cache).cap().get())
    }

    pub fn outcome(&self, uri: &str) -> Option<Arc<FetchOutcome>> {
        self.get::<FetchOutcome>(HTTP_RESOURCE_CACHE, uri)
    }

    pub fn has_outcome(&self, uri: &str) -> bool {
        self.exists(HTTP_RESOURCE_CACHE, uri)
    }

    /// Commits a fetch outcome under its requested URI.
    pub fn put_outcome(&self, outcome: FetchOutcome) -> Result<bool> {
        let key = outcome.uri.clone();
        self.put(HTTP_RESOURCE_CACHE, &key, outcome)
    }

    fn named(&self, name: &str) -> Option<NamedCache> {
        let caches = self.caches.read().unwrap_or_else(PoisonError::into_inner);
        caches.get(name).cloned()
    }
}

fn lock(cache: &NamedCache) -> MutexGuard<'_, LruCache<String, Entry>> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}
