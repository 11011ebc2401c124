use std::io::Write;

use ldqm_metrics::{AssessmentConfig, EstimatedExtensionalConciseness, MetricError, QualityMetric};
use ldqm_core::{Node, Statement};
use tempfile::NamedTempFile;

#[test]
fn loads_partial_toml_over_defaults() {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        r#"
spill_threshold = 10
dataset_uri = "http://data.example.org/"

[deref]
workers = 2
timeout_ms = 750

[retry]
max_rounds = 5

[sampling]
filter_count = 4
expected_items = 1000
seed = 99
"#
    )
    .expect("write");

    let config = AssessmentConfig::from_toml_file(file.path()).expect("config");
    assert_eq!(config.spill_threshold, 10);
    assert_eq!(config.deref.workers, 2);
    assert_eq!(config.deref.timeout_ms, 750);
    assert_eq!(config.deref.max_hops, 5);
    assert_eq!(config.retry.max_rounds, 5);
    assert_eq!(config.retry.poll_interval_ms, 100);
    assert_eq!(config.sampling.filter_count, 4);
    assert_eq!(config.sampling.reservoir_size, 6_000);
    assert_eq!(config.sampling.seed, Some(99));
    assert_eq!(config.dataset_uri.as_deref(), Some("http://data.example.org/"));
}

#[test]
fn empty_file_yields_defaults() {
    let file = NamedTempFile::new().expect("temp file");
    let config = AssessmentConfig::from_toml_file(file.path()).expect("config");
    assert_eq!(config.deref.workers, 8);
    assert_eq!(config.deref.cache_capacity, 5_000);
    assert_eq!(config.sampling.filter_count, 13);
    assert_eq!(config.spill_threshold, 100_000);
}

#[test]
fn invalid_sections_are_rejected() {
    assert!(matches!(
        AssessmentConfig::from_toml_str("[deref]\nworkers = 0\n"),
        Err(MetricError::Deref(_))
    ));
    assert!(matches!(
        AssessmentConfig::from_toml_str("spill_threshold = 0\n"),
        Err(MetricError::InvalidConfig(_))
    ));
    assert!(matches!(
        AssessmentConfig::from_toml_str("[deref]\nworkers = \"many\"\n"),
        Err(MetricError::Toml(_))
    ));
}

#[test]
fn seeded_configs_build_identical_filters() {
    let config =
        AssessmentConfig::from_toml_str("[sampling]\nfilter_count = 3\nexpected_items = 300\nseed = 5\n")
            .expect("config");

    let statements: Vec<Statement> = (0..60)
        .map(|idx| {
            Statement::new(
                Node::iri(format!("http://ex.org/s{idx}")),
                "http://ex.org/value",
                Node::literal((idx % 40).to_string()),
            )
        })
        .collect();

    let mut values = Vec::new();
    for _ in 0..2 {
        let mut metric = EstimatedExtensionalConciseness::new(&config).expect("metric");
        for statement in &statements {
            metric.compute(statement).expect("compute");
        }
        values.push(metric.metric_value().expect("value"));
    }

    assert_eq!(values[0], values[1]);
    // 20 of the 60 descriptions repeat an earlier one.
    assert!(values[0] <= 40.0 / 60.0 + 1e-9);
}

#[test]
fn invalid_filter_parameters_surface_as_sampling_errors() {
    let config = AssessmentConfig::from_toml_str("[sampling]\nfalse_positive_rate = 1.5\n")
        .expect("config");
    assert!(matches!(
        EstimatedExtensionalConciseness::new(&config),
        Err(MetricError::Sampling(_))
    ));
}
