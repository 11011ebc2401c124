use std::sync::Arc;
use std::thread;

use ldqm_sampling::ReservoirSampler;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[test]
fn inclusion_frequency_converges_to_k_over_n() {
    const TRIALS: u64 = 100_000;
    const K: usize = 3;
    const N: usize = 10;

    let mut hits = [0u64; N];
    for trial in 0..TRIALS {
        let sampler = ReservoirSampler::with_rng(K, false, ChaCha8Rng::seed_from_u64(trial))
            .expect("sampler");
        for item in 0..N {
            sampler.add(item);
        }
        for item in sampler.items() {
            hits[item] += 1;
        }
    }

    let expected = K as f64 / N as f64;
    for (item, count) in hits.iter().enumerate() {
        let frequency = *count as f64 / TRIALS as f64;
        assert!(
            (frequency - expected).abs() < 0.01,
            "item {item} retained with frequency {frequency}, expected {expected}"
        );
    }
}

#[test]
fn concurrent_adds_respect_capacity() {
    let sampler = Arc::new(ReservoirSampler::seeded(16, true, 11).expect("sampler"));
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let sampler = Arc::clone(&sampler);
            thread::spawn(move || {
                for idx in 0..1_000u32 {
                    sampler.add(worker * 10_000 + idx);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }

    assert_eq!(sampler.seen(), 4_000);
    assert_eq!(sampler.size(), 16);
    for item in sampler.items() {
        assert!(sampler.find_item(&item).is_some());
    }
}
