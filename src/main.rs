//! Parts-Harvester main entry point
//!
//! This is the command-line interface for the Parts-Harvester catalog scraper.

use anyhow::{bail, Context};
use clap::Parser;
use parts_harvester::config::{load_config_with_hash, Config, SessionBackend};
use parts_harvester::crawler::{normalize_keywords, Coordinator};
use parts_harvester::output::{print_statistics, retry_policy_for};
use parts_harvester::url::build_search_url;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Parts-Harvester: a catalog parts scraper
///
/// Parts-Harvester searches a parts catalog for every keyword, walks each
/// matching manufacturer's listing with a pool of sessions, and writes the
/// parts it finds into one CSV artifact with a capture of every page.
#[derive(Parser, Debug)]
#[command(name = "parts-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A bounded-concurrency catalog parts scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Search keywords, added to those in the configuration
    #[arg(value_name = "KEYWORDS")]
    keywords: Vec<String>,

    /// Output directory, overriding the configuration
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// File with one keyword per line ('#' starts a comment line)
    #[arg(long, value_name = "FILE")]
    keywords_file: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Use plain HTTP sessions instead of headless Chrome (no script support)
    #[arg(long)]
    http: bool,

    /// Validate config and show what would be searched without opening sessions
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
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.to_string_lossy().to_string();
    }

    if cli.http {
        config.browser.backend = SessionBackend::Http;
    }

    let keywords = collect_keywords(&config, cli.keywords_file.as_deref(), &cli.keywords)?;

    if cli.dry_run {
        handle_dry_run(&config, &keywords);
        return Ok(());
    }

    handle_harvest(config, config_hash, keywords).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("parts_harvester=info,warn"),
            1 => EnvFilter::new("parts_harvester=debug,info"),
            2 => EnvFilter::new("parts_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Merges configuration, file and command-line keywords, in that order
fn collect_keywords(
    config: &Config,
    keywords_file: Option<&Path>,
    cli_keywords: &[String],
) -> anyhow::Result<Vec<String>> {
    let mut keywords = config.keywords.clone();

    if let Some(path) = keywords_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read keywords file {}", path.display()))?;
        keywords.extend(
            content
                .lines()
                .filter(|line| !line.trim_start().starts_with('#'))
                .map(str::to_string),
        );
    }

    keywords.extend(cli_keywords.iter().cloned());
    Ok(normalize_keywords(keywords))
}

/// Handles the --dry-run mode: validates config and shows what would be searched
fn handle_dry_run(config: &Config, keywords: &[String]) {
    println!("=== Parts-Harvester Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Redirect marker: {}", config.site.redirect_marker);
    println!(
        "  Allowed categories: {}",
        config.site.allowed_categories.join(", ")
    );

    println!("\nCrawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Sessions: {}", config.crawler.session_count());
    println!("  Page timeout: {}ms", config.crawler.page_timeout_ms);
    match config.crawler.max_pages {
        Some(max) => println!("  Max pages per manufacturer: {}", max),
        None => println!("  Max pages per manufacturer: unlimited"),
    }

    println!("\nSessions:");
    match config.browser.backend {
        SessionBackend::Chrome => {
            println!("  Backend: headless Chrome");
            println!(
                "  Chrome: {}",
                config.browser.chrome_path.as_deref().unwrap_or("auto-detect")
            );
            println!("  Headless: {}", config.browser.headless);
            println!("  Sandbox: {}", config.browser.sandbox);
            println!(
                "  Window: {}x{}",
                config.browser.window_width, config.browser.window_height
            );
        }
        SessionBackend::Http => println!("  Backend: HTTP (scripted pagers are not followed)"),
    }

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  Artifact: {}.csv", config.output.artifact_name);
    println!("  Captures: {}", config.output.screenshot_folder);
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }

    println!("\nKeywords ({}):", keywords.len());
    for keyword in keywords {
        println!("  - {}", keyword);
        println!("    * {}", build_search_url(&config.site.search_url, keyword));
    }

    println!("\n✓ Configuration is valid");
    if keywords.is_empty() {
        println!("✓ Nothing to search: no keywords given");
    } else {
        println!("✓ Would search {} keyword(s)", keywords.len());
    }
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: Config,
    config_hash: String,
    keywords: Vec<String>,
) -> anyhow::Result<()> {
    if keywords.is_empty() {
        tracing::warn!("No keywords provided. Skipping data fetch.");
        return Ok(());
    }

    tracing::info!(
        "Harvesting {} keyword(s) with {} worker(s) into {}",
        keywords.len(),
        config.crawler.workers,
        config.output.directory
    );

    let retry = retry_policy_for(&config.output);
    let coordinator = Coordinator::new(config)
        .context("harvest setup failed")?
        .with_config_hash(config_hash);

    let stats = match coordinator.run(&keywords, retry).await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            return Err(e.into());
        }
    };

    println!();
    print_statistics(&stats);

    if stats.artifact.is_none() {
        bail!("the artifact was not saved");
    }
    tracing::info!("Harvest completed successfully");
    Ok(())
}
