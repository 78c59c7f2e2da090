use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rample_core::{
    load_config, validate_config, AggregateReport, HttpServiceClient, Orchestrator, PollPolicy,
    RemoteService, SanitizedConfig, TestCase, TestOutcome,
};

#[derive(Parser)]
#[command(
    name = "rample",
    about = "Run preset integration tests against a media platform",
    version,
    long_about = None
)]
struct Cli {
    /// Instance config file (.json or .toml)
    #[arg(env = "RAMPLE_CONFIG", default_value = "sample_instance_config.json")]
    config: PathBuf,

    /// Maximum number of tests running at once
    #[arg(long)]
    max_workers: Option<usize>,

    /// Write the full report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    match run(cli).await {
        Ok(report) => std::process::exit(report.exit_code()),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    // stdout is reserved for the summary
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> Result<AggregateReport> {
    info!("Loading configuration from {:?}", cli.config);
    let mut config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    if let Some(max_workers) = cli.max_workers {
        config.orchestrator.max_workers = max_workers;
    }
    validate_config(&config).context("Configuration validation failed")?;

    debug!(
        "Configuration: {}",
        serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default()
    );
    info!(
        "Testing env {} with {} of {} tests enabled",
        config.service.endpoint(),
        config.enabled_count(),
        config.tests.len()
    );

    let client = HttpServiceClient::new(&config.service)
        .context("Failed to create remote service client")?;
    let service: Arc<dyn RemoteService> = Arc::new(client);

    let cases = TestCase::from_config(&config).context("Invalid test definition")?;
    let orchestrator = Orchestrator::new(
        config.orchestrator.clone(),
        service,
        PollPolicy::from(&config.polling),
    )?
    .with_progress_callback(Arc::new(|_: &TestOutcome| {
        print!(".");
        let _ = std::io::stdout().flush();
    }));

    let report = orchestrator.run(cases).await;
    println!();

    print_summary(&report)?;
    if let Some(path) = &cli.report {
        write_report(&report, path)?;
    }

    Ok(report)
}

fn print_summary(report: &AggregateReport) -> Result<()> {
    println!("Presets: {} passed, {} total", report.passed, report.total);

    if !report.failures.is_empty() {
        let summary: Vec<_> = report
            .failures
            .iter()
            .map(|f| {
                json!({
                    "name": f.name,
                    "asset": f.asset,
                    "error": f.error,
                    "trace": f.trace,
                    "kind": f.kind,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

fn write_report(report: &AggregateReport, path: &Path) -> Result<()> {
    let body = serde_json::to_string_pretty(report)?;
    std::fs::write(path, body).with_context(|| format!("Failed to write report to {:?}", path))?;
    info!("Report written to {:?}", path);
    Ok(())
}
