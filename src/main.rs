//! SEO Orchestrator main entry point
//!
//! This is the command-line interface for the sitemap-driven SEO audit
//! pipeline.

use anyhow::{bail, Context};
use clap::Parser;
use seo_orchestrator::config::{load_config_with_hash, validation::validate_credential, Config};
use seo_orchestrator::events::{self, CrawlPhase, EventReceiver, ProgressEvent};
use seo_orchestrator::gateway::credential_error_message;
use seo_orchestrator::{run_pipeline, Gateway, PipelineRequest};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// SEO Orchestrator: sitemap-driven site audits
///
/// Crawls a sitemap tree through forwarding proxies, ranks the pages it
/// finds, and runs them through a series of model calls that produce a
/// sitewide audit, a page-level plan, implementation guides and an
/// executive summary.
#[derive(Parser, Debug)]
#[command(name = "seo-orchestrator")]
#[command(version)]
#[command(about = "Sitemap-driven SEO audits", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Sitemap URL of the site to analyze
    #[arg(long, value_name = "URL")]
    sitemap: String,

    /// Competitor sitemap URL (repeatable)
    #[arg(long = "competitor", value_name = "URL")]
    competitors: Vec<String>,

    /// Ask the provider to find competitor sitemaps (Gemini only)
    #[arg(long)]
    discover_competitors: bool,

    /// Provider API key, overriding the configuration file
    #[arg(long, env = "SEO_ORCHESTRATOR_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Write the JSON report here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would run without calling anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(api_key) = &cli.api_key {
        config.provider.api_key = api_key.clone();
    }
    validate_credential(&config.provider)?;

    let request = PipelineRequest {
        sitemap_url: cli.sitemap.clone(),
        competitor_sitemaps: cli.competitors.clone(),
        discover_competitors: cli.discover_competitors,
    };

    if cli.dry_run {
        handle_dry_run(&config, &request);
        return Ok(());
    }

    handle_run(config, request, cli.output).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("seo_orchestrator=info,warn"),
            1 => EnvFilter::new("seo_orchestrator=debug,info"),
            2 => EnvFilter::new("seo_orchestrator=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would run
fn handle_dry_run(config: &Config, request: &PipelineRequest) {
    println!("=== SEO Orchestrator Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Seed sitemap: {}", request.sitemap_url);
    println!(
        "  Max concurrent sitemaps: {}",
        config.crawler.max_concurrent_sitemaps
    );
    println!("  URL sample cap: {}", config.crawler.max_url_sample_size);
    println!("  Crawl timeout: {}s", config.crawler.crawl_timeout_secs);
    println!("  User agent: {}", config.crawler.user_agent);

    println!("\nProxies ({}):", config.proxy.templates.len());
    for template in &config.proxy.templates {
        println!("  - {}", template);
    }

    println!("\nProvider:");
    println!("  Kind: {}", config.provider.kind);
    println!("  Model: {}", config.provider.model());
    println!("  Endpoint: {}", config.provider.base_url());
    println!(
        "  Retries: {} attempts, {}ms base delay",
        config.gateway.max_attempts, config.gateway.base_delay_ms
    );

    println!("\nAnalysis:");
    println!("  Type: {}", config.analysis.kind);
    if let Some(location) = &config.analysis.location {
        println!("  Location: {}", location);
    }
    println!(
        "  Guide batches: {} tasks each, {} at a time",
        config.batch.batch_size, config.batch.concurrent_batches
    );

    println!("\nCompetitor Sitemaps ({}):", request.competitor_sitemaps.len());
    for competitor in &request.competitor_sitemaps {
        println!("  - {}", competitor);
    }
    if request.discover_competitors {
        println!("  (plus provider discovery)");
    }

    println!("\n✓ Configuration is valid");
}

/// Logs crawl progress until the channel closes
async fn drain_events(mut receiver: EventReceiver) {
    while let Some(event) = receiver.recv().await {
        // log entries are traced where they are produced
        if let ProgressEvent::Crawl(progress) = event {
            match progress.phase {
                CrawlPhase::SitemapProcessed => tracing::info!(
                    "Processed {}/{} sitemaps, {} pages found",
                    progress.processed,
                    progress.total,
                    progress.pages_found
                ),
                CrawlPhase::PagesDiscovered => tracing::debug!(
                    "{} pages found, latest {}",
                    progress.pages_found,
                    progress.last_url_found.unwrap_or_default()
                ),
            }
        }
    }
}

/// Handles the main pipeline run
async fn handle_run(
    config: Config,
    request: PipelineRequest,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let gateway = Gateway::new(config.provider.clone())?;

    tracing::info!("Verifying {} credentials", config.provider.kind);
    if let Err(e) = gateway.verify_credentials().await {
        bail!("Credential check failed: {}", credential_error_message(&e));
    }

    let (sender, receiver) = events::channel();
    let drain = tokio::spawn(drain_events(receiver));

    let result = run_pipeline(&config, &gateway, &request, Some(sender)).await;
    if let Err(e) = drain.await {
        tracing::warn!("Progress logger stopped: {}", e);
    }

    let report = match result {
        Ok(report) => report,
        Err(failure) => {
            tracing::error!(
                "Pipeline stopped after {} log entries",
                failure.log.len()
            );
            return Err(failure.into());
        }
    };

    tracing::info!(
        "Report ready: {} ranked pages, {} action items over {} days",
        report.ranked_urls.len(),
        report.action_count(),
        report.action_plan.len()
    );

    let json = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => {
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("✓ Report written to: {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
