use ldqm_sampling::LoadBalancedBloomFilter;

#[test]
fn never_inserted_item_is_new_on_fresh_filters() {
    let trials = 2_000u64;
    let p = 0.01;
    let mut reported_new = 0u64;

    for seed in 0..trials {
        let mut filter = LoadBalancedBloomFilter::seeded(13, 1_000, p, seed).expect("filter");
        assert!(!filter.check_duplicate("A"));
        assert!(filter.check_duplicate("A"));
        if !filter.check_duplicate("B") {
            reported_new += 1;
        }
    }

    assert!(reported_new as f64 / trials as f64 >= 1.0 - p);
}

#[test]
fn false_positive_rate_stays_near_target_at_capacity() {
    let p = 0.01;
    let mut filter = LoadBalancedBloomFilter::seeded(4, 4_000, p, 77).expect("filter");

    for idx in 0..4_000 {
        filter.check_duplicate(&format!("http://example.org/item/{idx}"));
    }

    let probes = 10_000;
    let false_positives = (0..probes)
        .filter(|idx| filter.contains(&format!("http://example.org/probe/{idx}")))
        .count();
    let rate = false_positives as f64 / probes as f64;

    assert!(rate < 2.5 * p, "observed false positive rate {rate}");
    assert!(filter.estimated_false_positive_rate() < 2.0 * p);
}

#[test]
fn no_false_negatives() {
    let mut filter = LoadBalancedBloomFilter::seeded(5, 500, 0.05, 3).expect("filter");
    let items: Vec<String> = (0..500).map(|idx| format!("subject-{idx}")).collect();
    for item in &items {
        filter.check_duplicate(item);
    }
    for item in &items {
        assert!(filter.check_duplicate(item), "{item} lost");
    }
}

#[test]
fn items_spread_over_all_filters() {
    let mut filter = LoadBalancedBloomFilter::seeded(8, 8_000, 0.01, 21).expect("filter");
    for idx in 0..8_000u32 {
        filter.check_duplicate(&idx);
    }
    for load in filter.loads() {
        assert!(*load > 800 && *load < 1_200, "unbalanced load {load}");
    }
}
