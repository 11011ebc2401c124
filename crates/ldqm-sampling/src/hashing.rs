use std::hash::{Hash, Hasher};

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// Seeded FNV-1a hasher. Stable across runs and platforms, unlike
/// `DefaultHasher`, so filter contents are reproducible from a seed.
#[derive(Debug, Clone)]
pub struct SeededFnv {
    state: u64,
}

impl SeededFnv {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed ^ FNV_OFFSET,
        }
    }
}

impl Hasher for SeededFnv {
    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.state ^= *byte as u64;
            self.state = self.state.wrapping_mul(FNV_PRIME);
        }
    }

    fn finish(&self) -> u64 {
        fmix64(self.state)
    }
}

/// Murmur3 finaliser; spreads FNV output over all 64 bits.
pub fn fmix64(mut value: u64) -> u64 {
    value ^= value >> 33;
    value = value.wrapping_mul(0xff51afd7ed558ccd);
    value ^= value >> 33;
    value = value.wrapping_mul(0xc4ceb9fe1a85ec53);
    value ^= value >> 33;
    value
}

pub fn hash_with_seed<T: Hash + ?Sized>(seed: u64, item: &T) -> u64 {
    let mut hasher = SeededFnv::new(seed);
    item.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_change_the_hash() {
        let a = hash_with_seed(1, "http://example.org/a");
        let b = hash_with_seed(2, "http://example.org/a");
        assert_ne!(a, b);
        assert_eq!(a, hash_with_seed(1, "http://example.org/a"));
    }
}
