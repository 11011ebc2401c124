use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::errors::{Result, SamplingError};

/// Fixed-capacity uniform sample over a stream of unknown length.
///
/// Implements Algorithm R: the first `k` items are kept, then the `n`-th item
/// (zero based) replaces a random slot with probability `k / (n + 1)`. After
/// `n >= k` insertions every observed item is retained with probability
/// exactly `k / n`.
///
/// Every public operation runs inside one critical section, so a sampler can
/// be shared by reference between threads. The random source is injected;
/// use [`ReservoirSampler::seeded`] for reproducible samples.
pub struct ReservoirSampler<T, R = ChaCha8Rng> {
    capacity: usize,
    state: Mutex<ReservoirState<T, R>>,
}

struct ReservoirState<T, R> {
    seen: u64,
    items: Vec<T>,
    // Multiplicity per retained item; only kept when the sampler is indexed.
    index: Option<HashMap<T, usize>>,
    rng: R,
}

impl<T> ReservoirSampler<T, ChaCha8Rng>
where
    T: Clone + Eq + Hash,
{
    /// Sampler seeded from the thread-local entropy source.
    pub fn new(capacity: usize, indexed: bool) -> Result<Self> {
        let rng = ChaCha8Rng::from_rng(&mut rand::rng());
        Self::with_rng(capacity, indexed, rng)
    }

    pub fn seeded(capacity: usize, indexed: bool, seed: u64) -> Result<Self> {
        Self::with_rng(capacity, indexed, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<T, R> ReservoirSampler<T, R>
where
    T: Clone + Eq + Hash,
    R: RngCore,
{
    pub fn with_rng(capacity: usize, indexed: bool, rng: R) -> Result<Self> {
        if capacity == 0 {
            return Err(SamplingError::InvalidCapacity(capacity));
        }

        Ok(Self {
            capacity,
            state: Mutex::new(ReservoirState {
                seen: 0,
                items: Vec::with_capacity(capacity.min(1024)),
                index: indexed.then(HashMap::new),
                rng,
            }),
        })
    }

    /// Offers `item` to the reservoir. Returns true when it was retained.
    pub fn add(&self, item: T) -> bool {
        let mut state = self.lock();
        state.offer(item, self.capacity)
    }

    /// Adds `item` only when it is not currently retained, in a single
    /// critical section. Returns true when it was retained.
    pub fn add_if_absent(&self, item: T) -> bool {
        let mut state = self.lock();
        if state.contains(&item) {
            return false;
        }
        state.offer(item, self.capacity)
    }

    /// Returns the retained copy of `item`, if any.
    pub fn find_item(&self, item: &T) -> Option<T> {
        let state = self.lock();
        if let Some(index) = &state.index {
            return index.get_key_value(item).map(|(key, _)| key.clone());
        }
        state.items.iter().find(|current| *current == item).cloned()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.lock().contains(item)
    }

    /// Snapshot of the retained items, in slot order.
    pub fn items(&self) -> Vec<T> {
        self.lock().items.clone()
    }

    pub fn size(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items offered so far, retained or not.
    pub fn seen(&self) -> u64 {
        self.lock().seen
    }

    fn lock(&self) -> MutexGuard<'_, ReservoirState<T, R>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, R> ReservoirState<T, R>
where
    T: Clone + Eq + Hash,
    R: RngCore,
{
    fn offer(&mut self, item: T, capacity: usize) -> bool {
        let seen = self.seen;
        let retained = if seen < capacity as u64 {
            self.index_insert(&item);
            self.items.push(item);
            true
        } else {
            let slot = self.rng.random_range(0..=seen);
            if slot < capacity as u64 {
                self.index_insert(&item);
                let evicted = std::mem::replace(&mut self.items[slot as usize], item);
                self.index_remove(&evicted);
                true
            } else {
                false
            }
        };

        self.seen += 1;
        retained
    }

    fn contains(&self, item: &T) -> bool {
        match &self.index {
            Some(index) => index.contains_key(item),
            None => self.items.contains(item),
        }
    }

    fn index_insert(&mut self, item: &T) {
        if let Some(index) = self.index.as_mut() {
            *index.entry(item.clone()).or_insert(0) += 1;
        }
    }

    fn index_remove(&mut self, item: &T) {
        let Some(index) = self.index.as_mut() else {
            return;
        };
        if let Some(count) = index.get_mut(item) {
            *count -= 1;
            if *count == 0 {
                index.remove(item);
            }
        }
    }
}
