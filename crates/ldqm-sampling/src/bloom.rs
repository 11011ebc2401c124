use std::f64::consts::LN_2;
use std::hash::Hash;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::errors::{Result, SamplingError};
use crate::hashing::hash_with_seed;

/// `k` independent bloom filters with items spread across them.
///
/// Filter assignment: a dedicated seeded hash of the item, reduced modulo
/// `k`, selects the one filter that owns the item. The item's bit pattern
/// inside that filter comes from double hashing (`h1 + i * h2`) with two
/// further seeds. All three seeds are drawn from the injected random source
/// at construction, so two filters built from the same seed behave
/// identically.
///
/// Filters are sized so each holds `ceil(expected_items / k)` items at the
/// target false-positive rate. There are no false negatives: an item already
/// checked is always reported as a duplicate afterwards.
#[derive(Debug, Clone)]
pub struct LoadBalancedBloomFilter {
    filters: Vec<Vec<u64>>,
    loads: Vec<u64>,
    bits_per_filter: u64,
    hash_count: u32,
    false_positive_rate: f64,
    selector_seed: u64,
    seeds: (u64, u64),
}

impl LoadBalancedBloomFilter {
    /// Filter with hash seeds drawn from the thread-local entropy source.
    pub fn new(filter_count: usize, expected_items: u64, false_positive_rate: f64) -> Result<Self> {
        let mut rng = ChaCha8Rng::from_rng(&mut rand::rng());
        Self::with_rng(filter_count, expected_items, false_positive_rate, &mut rng)
    }

    pub fn seeded(
        filter_count: usize,
        expected_items: u64,
        false_positive_rate: f64,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Self::with_rng(filter_count, expected_items, false_positive_rate, &mut rng)
    }

    pub fn with_rng<R: RngCore + ?Sized>(
        filter_count: usize,
        expected_items: u64,
        false_positive_rate: f64,
        rng: &mut R,
    ) -> Result<Self> {
        if filter_count == 0 {
            return Err(SamplingError::InvalidFilter(
                "filter count must be positive".to_string(),
            ));
        }
        if expected_items == 0 {
            return Err(SamplingError::InvalidFilter(
                "expected item count must be positive".to_string(),
            ));
        }
        if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
            return Err(SamplingError::InvalidFilter(format!(
                "false positive rate must be in (0, 1), got {false_positive_rate}"
            )));
        }

        let per_filter = expected_items.div_ceil(filter_count as u64);
        let bits_per_filter = optimal_bits(per_filter, false_positive_rate);
        let hash_count = optimal_hashes(bits_per_filter, per_filter);
        let words = bits_per_filter.div_ceil(64) as usize;

        debug!(
            filters = filter_count,
            bits_per_filter,
            hash_count,
            false_positive_rate,
            "load-balanced bloom filter allocated"
        );

        Ok(Self {
            filters: vec![vec![0u64; words]; filter_count],
            loads: vec![0; filter_count],
            bits_per_filter,
            hash_count,
            false_positive_rate,
            selector_seed: rng.random(),
            seeds: (rng.random(), rng.random()),
        })
    }

    /// Tests and sets the item's bits in its assigned filter.
    ///
    /// Returns true when every bit was already set (probable duplicate, the
    /// filter is left untouched), false when the item is new and its bits
    /// were set by this call.
    pub fn check_duplicate<T: Hash + ?Sized>(&mut self, item: &T) -> bool {
        let filter_idx = self.filter_index(item);
        let positions = self.bit_positions(item);
        let filter = &mut self.filters[filter_idx];

        let mut duplicate = true;
        for position in positions {
            let (word, mask) = locate(position);
            if filter[word] & mask == 0 {
                duplicate = false;
                filter[word] |= mask;
            }
        }

        if !duplicate {
            self.loads[filter_idx] += 1;
        }
        duplicate
    }

    /// Membership test without mutation.
    pub fn contains<T: Hash + ?Sized>(&self, item: &T) -> bool {
        let filter = &self.filters[self.filter_index(item)];
        self.bit_positions(item).all(|position| {
            let (word, mask) = locate(position);
            filter[word] & mask != 0
        })
    }

    /// Index of the filter that owns `item`.
    pub fn filter_index<T: Hash + ?Sized>(&self, item: &T) -> usize {
        (hash_with_seed(self.selector_seed, item) % self.filters.len() as u64) as usize
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    pub fn bits_per_filter(&self) -> u64 {
        self.bits_per_filter
    }

    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    pub fn false_positive_rate(&self) -> f64 {
        self.false_positive_rate
    }

    /// Items recorded as new, per filter.
    pub fn loads(&self) -> &[u64] {
        &self.loads
    }

    /// False-positive probability implied by the current loads, averaged
    /// over filters.
    pub fn estimated_false_positive_rate(&self) -> f64 {
        let m = self.bits_per_filter as f64;
        let h = self.hash_count as f64;
        let total: f64 = self
            .loads
            .iter()
            .map(|load| (1.0 - (-h * *load as f64 / m).exp()).powf(h))
            .sum();
        total / self.loads.len() as f64
    }

    fn bit_positions<T: Hash + ?Sized>(&self, item: &T) -> impl Iterator<Item = u64> + use<T> {
        let h1 = hash_with_seed(self.seeds.0, item);
        let h2 = hash_with_seed(self.seeds.1, item) | 1;
        let bits = self.bits_per_filter;
        (0..self.hash_count as u64).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % bits)
    }
}

/// Bits needed for `items` entries at false-positive rate `p`:
/// `m = -n ln p / (ln 2)^2`.
pub fn optimal_bits(items: u64, p: f64) -> u64 {
    let bits = (-(items as f64) * p.ln() / (LN_2 * LN_2)).ceil();
    (bits as u64).max(64)
}

/// Hash functions minimising false positives: `h = (m / n) ln 2`.
pub fn optimal_hashes(bits: u64, items: u64) -> u32 {
    let hashes = (bits as f64 / items.max(1) as f64 * LN_2).round();
    (hashes as u32).max(1)
}

fn locate(position: u64) -> (usize, u64) {
    ((position / 64) as usize, 1u64 << (position % 64))
}
