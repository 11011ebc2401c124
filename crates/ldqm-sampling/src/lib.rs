//! Bounded-memory structures for approximating statistics over unbounded
//! statement streams.
//!
//! - [`ReservoirSampler`]: fixed-size uniform sample (Algorithm R).
//! - [`LoadBalancedBloomFilter`]: approximate duplicate detection without
//!   false negatives.
//! - [`HybridSet`]: exact set that overflows to an embedded store once it
//!   grows past a threshold.

pub mod bloom;
pub mod errors;
pub mod hashing;
pub mod reservoir;
pub mod spill;

pub use bloom::LoadBalancedBloomFilter;
pub use errors::{Result, SamplingError};
pub use reservoir::ReservoirSampler;
pub use spill::{HybridSet, SpillableSet};
