use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use ops_reporter::config::load_config;
use ops_reporter::pipeline::{self, coverage_ready, inspection_ready, RunOptions};
use ops_reporter::{Ec2Inventory, OpenAiSummarizer, Settings};

#[derive(Parser, Debug)]
#[command(name = "ops-reporter", version, about = "EC2 RI coverage and Prometheus inspection reports")]
struct Cli {
    /// Path to the YAML settings file
    #[arg(long, global = true, env = "OPS_REPORTER_CONFIG")]
    config: Option<PathBuf>,

    /// Skip the Mattermost notification even when it is enabled
    #[arg(long, global = true)]
    no_notify: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyse Reserved Instance coverage across the configured regions
    Coverage,
    /// Summarise Prometheus host metrics with an LLM
    Inspect,
}

impl Commands {
    fn log_name(&self) -> &'static str {
        match self {
            Commands::Coverage => "ri_coverage",
            Commands::Inspect => "prometheus_inspection",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match load_config(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            let _ = init_tracing(None, cli.command.log_name());
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let _guard = init_tracing(Some(&settings.logging.dir), cli.command.log_name());

    let options = RunOptions::new(!cli.no_notify);
    let result = match cli.command {
        Commands::Coverage => run_coverage(&settings, options).await,
        Commands::Inspect => run_inspection(&settings, options).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_coverage(settings: &Settings, options: RunOptions) -> Result<()> {
    if !coverage_ready(settings)? {
        return Ok(());
    }

    let inventory = Ec2Inventory::new(&settings.ri_analysis);
    let run = pipeline::run_coverage(&inventory, settings, options).await;
    if !run.archive.is_complete() {
        warn!("Coverage report could not be archived; printing it only");
    }
    println!("{}", run.markdown);
    Ok(())
}

async fn run_inspection(settings: &Settings, options: RunOptions) -> Result<()> {
    if !inspection_ready(settings)? {
        return Ok(());
    }

    let inspection = &settings.prometheus_inspection;
    let summarizer = OpenAiSummarizer::new(
        &inspection.api_base,
        inspection.openai_api_key.as_deref().unwrap_or_default(),
        &inspection.model,
        Duration::from_secs(inspection.timeout_secs.max(1)),
    )
    .context("Failed to set up completion client")?;
    let run = pipeline::run_inspection(settings, &summarizer, options)
        .await
        .context("Prometheus inspection failed")?;

    println!("Metrics collected: {}", run.report.metrics_count);
    println!("\n{}", run.report.ai_summary);
    Ok(())
}

/// Stdout plus, when a directory is given, `<dir>/<name>.log`. The returned
/// guard flushes the file writer on drop.
fn init_tracing(log_dir: Option<&Path>, name: &str) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false);

    let file = log_dir.and_then(|dir| match std::fs::create_dir_all(dir) {
        Ok(()) => Some(tracing_appender::non_blocking(tracing_appender::rolling::never(
            dir,
            format!("{}.log", name),
        ))),
        Err(e) => {
            eprintln!("Cannot create log directory {}: {}", dir.display(), e);
            None
        }
    });

    match file {
        Some((writer, guard)) => {
            let file_layer = fmt::layer().with_target(false).with_ansi(false).with_writer(writer);
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .with(file_layer)
                .try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .try_init();
            None
        }
    }
}
