mod input;
mod logging;

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use ldqm_core::CoreError;
use ldqm_deref::{DerefError, HttpFetcher};
use ldqm_metrics::{
    AssessmentConfig, DerefContext, Dereferenceability, EstimatedDereferenceability, MetricError,
    MetricReport, QualityMetric, latency_score, throughput_score,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use input::read_statements;
use logging::init_logging;

#[derive(Debug, Error)]
enum CliError {
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("dereferencing error: {0}")]
    Deref(#[from] DerefError),
    #[error("metric error: {0}")]
    Metric(#[from] MetricError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("logging error: {0}")]
    Logging(String),
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

#[derive(Parser, Debug)]
#[command(name = "ldqm", version, about = "Linked Data quality metrics")]
struct Cli {
    /// Assessment configuration (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Append JSON logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dereference every URI in a statement or URI list.
    Deref(DerefArgs),
    /// Measure the burst delay of a single URI.
    Latency(LatencyArgs),
}

#[derive(Args, Debug)]
struct DerefArgs {
    /// N-Triples file, or one URI per line.
    #[arg(long)]
    input: PathBuf,
    /// Dereference a uniform sample instead of every URI.
    #[arg(long, default_value_t = false)]
    estimate: bool,
}

#[derive(Args, Debug)]
struct LatencyArgs {
    uri: String,
    /// Sequential requests in the burst.
    #[arg(long, default_value_t = 5)]
    requests: u32,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    run_id: String,
    started_at: DateTime<Utc>,
    duration_ms: u64,
    statements: usize,
    report: MetricReport,
}

#[derive(Debug, Serialize)]
struct LatencySummary {
    uri: String,
    requests: u32,
    elapsed_ms: u64,
    latency_score: f64,
    throughput_score: f64,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Deref(args) => run_deref(args, &config),
        Command::Latency(args) => run_latency(args, &config),
    }
}

fn load_config(path: Option<&Path>) -> Result<AssessmentConfig, CliError> {
    match path {
        Some(path) => {
            let config = AssessmentConfig::from_toml_file(path)?;
            tracing::info!(event = "config_loaded", path = %path.display());
            Ok(config)
        }
        None => Ok(AssessmentConfig::default()),
    }
}

fn run_deref(args: DerefArgs, config: &AssessmentConfig) -> Result<(), CliError> {
    let run_id = Uuid::new_v4().to_string();
    let started_at = Utc::now();
    let timer = Instant::now();
    tracing::info!(event = "run_started", run_id = %run_id, input = %args.input.display());

    let statements = read_statements(&args.input)?;
    tracing::info!(event = "input_read", statements = statements.len());

    let context = DerefContext::new(config)?;
    let mut metric: Box<dyn QualityMetric> = if args.estimate {
        Box::new(EstimatedDereferenceability::new(context, config)?)
    } else {
        Box::new(Dereferenceability::new(context, config)?)
    };

    for statement in &statements {
        metric.compute(statement)?;
    }
    let report = MetricReport::collect(metric.as_mut())?;

    let duration_ms = timer.elapsed().as_millis() as u64;
    tracing::info!(
        event = "run_finished",
        run_id = %run_id,
        value = report.value,
        duration_ms
    );

    let summary = RunSummary {
        run_id,
        started_at,
        duration_ms,
        statements: statements.len(),
        report,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_latency(args: LatencyArgs, config: &AssessmentConfig) -> Result<(), CliError> {
    if args.requests == 0 {
        return Err(CliError::InvalidArgs(
            "--requests must be positive".to_string(),
        ));
    }

    let fetcher = HttpFetcher::new(&config.deref)?;
    let elapsed = fetcher.measure_burst_delay(&args.uri, args.requests);
    let average = elapsed as f64 / f64::from(args.requests);

    let summary = LatencySummary {
        uri: args.uri,
        requests: args.requests,
        elapsed_ms: elapsed as u64,
        latency_score: latency_score(average),
        throughput_score: throughput_score(args.requests, elapsed as f64),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
