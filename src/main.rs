//! # promo-watch CLI
//!
//! Command-line front end for the promotion monitor.
//!
//! - `run`: check every configured site and write the result files
//! - `links`: print the candidate pages found on one homepage, without
//!   calling the model
//!
//! Environment variables from a `.env` file in the working directory are
//! loaded before the configuration is read.

mod telemetry;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use promo_watch::config::{ConfigFile, Settings, SettingsBuilder};
use promo_watch::extractor::extract_candidates;
use promo_watch::fetcher::Fetcher;
use promo_watch::monitor::{Monitor, RunPhase, SiteProgress};
use promo_watch::{model, report};
use telemetry::{OtelGuard, TelemetryOptions};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};
use url::Url;

#[derive(Parser)]
#[command(author, version, about = "Checks websites for promotions with an LLM", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check every configured site and write the results
    Run(RunArgs),

    /// Print the candidate promotion pages linked from a homepage
    Links(LinksArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Path to the YAML configuration
    #[arg(short, long, default_value = "config.yml")]
    config: PathBuf,

    /// Directory for the result files (overrides `output_dir`)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Maximum number of pages in flight (overrides `max_concurrent`)
    #[arg(short = 'j', long)]
    max_concurrent: Option<usize>,

    /// Also write a static HTML report
    #[arg(long)]
    html_report: bool,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Export traces and metrics over OTLP
    #[arg(long)]
    otel: bool,
}

#[derive(Args, Debug)]
struct LinksArgs {
    /// Homepage URL to inspect
    #[arg(required = true)]
    url: String,

    /// Path to the YAML configuration, used for keywords and fetch settings
    #[arg(short, long, default_value = "config.yml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let options = match &cli.command {
        Commands::Run(args) => TelemetryOptions {
            log_file: args.log_file.as_deref(),
            otel: args.otel,
        },
        Commands::Links(_) => TelemetryOptions::default(),
    };
    let _otel: OtelGuard = telemetry::init_tracing_subscriber(options)?;

    match cli.command {
        Commands::Run(args) => run_command(args).await,
        Commands::Links(args) => links_command(args).await,
    }
}

#[instrument]
async fn run_command(args: RunArgs) -> anyhow::Result<()> {
    RunPhase::Idle.log();
    RunPhase::LoadingConfig.log();
    let settings = Settings::load(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;

    let mut builder = SettingsBuilder::from_settings(settings);
    if let Some(output_dir) = args.output_dir {
        builder = builder.output_dir(output_dir);
    }
    if let Some(max_concurrent) = args.max_concurrent {
        builder = builder.max_concurrent(max_concurrent);
    }
    if args.html_report {
        builder = builder.html_report(true);
    }
    let settings = builder.build();
    settings.validate()?;
    let settings = Arc::new(settings);

    let model = model::gemini_from_settings(&settings)?;
    let monitor = Monitor::new(settings.clone(), model)?;

    println!(
        "Checking {} sites with {} (max {} pages in flight)...",
        settings.sites.len(),
        settings.model_name,
        settings.max_concurrent
    );

    let (progress_sender, mut progress_receiver) = mpsc::channel::<SiteProgress>(100);

    let progress_bar = ProgressBar::new(settings.sites.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")?
            .progress_chars("##-"),
    );
    progress_bar.set_message("Checking sites...");

    let start_time = Instant::now();

    let progress_handle = tokio::spawn({
        let progress_bar = progress_bar.clone();
        async move {
            while let Some(progress) = progress_receiver.recv().await {
                progress_bar.inc(1);
                let message = match (&progress.error, progress.has_promotion) {
                    (Some(error), _) => format!("{} failed: {}", progress.site, error),
                    (None, true) => format!("{}: promotion found", progress.site),
                    (None, false) => format!("{}: {} pages, no promotion", progress.site, progress.pages),
                };
                progress_bar.set_message(message);
            }
            progress_bar.finish_with_message("All sites checked");
        }
    });

    let output = monitor.run_with_progress(Some(progress_sender)).await;

    // Ends once the monitor drops the last sender
    let _ = progress_handle.await;
    let elapsed = start_time.elapsed();

    RunPhase::WritingResults.log();
    let files = report::write_run(&output, &settings).context("Failed to write results")?;
    RunPhase::Done.log();

    if output.failed_sites() > 0 {
        warn!(failed = output.failed_sites(), "Some sites could not be checked");
    }

    println!(
        "Monitoring complete. {} sites checked in {:.1}s, {} with promotions",
        output.len(),
        elapsed.as_secs_f64(),
        output.promotions_found()
    );
    println!("Results saved to {} and {}", files.json.display(), files.csv.display());
    if let Some(html) = &files.html {
        println!("HTML report saved to {}", html.display());
    }

    Ok(())
}

#[instrument]
async fn links_command(args: LinksArgs) -> anyhow::Result<()> {
    let settings = link_settings(&args.config)?;
    let homepage = Url::parse(&args.url).with_context(|| format!("Invalid URL: {}", args.url))?;

    let fetcher = Fetcher::new(&settings)?;
    let html = fetcher.fetch(homepage.as_str()).await?;

    let candidates = extract_candidates(
        &homepage,
        &html,
        &settings.keywords,
        settings.max_pages_per_site,
    );
    info!(count = candidates.len(), "Candidates extracted");

    println!("Found {} candidate pages on {}", candidates.len(), homepage);
    for (i, candidate) in candidates.iter().enumerate() {
        println!("{}. {}", i + 1, candidate);
    }

    Ok(())
}

/// Settings for the `links` command: the config file when it exists, without
/// requiring sites or an API key; defaults otherwise
fn link_settings(path: &Path) -> anyhow::Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file = if yaml.trim().is_empty() {
        ConfigFile::default()
    } else {
        serde_yaml::from_str::<ConfigFile>(&yaml)
            .with_context(|| format!("Failed to parse {}", path.display()))?
    };
    Ok(Settings::from_config_file(file, None))
}
