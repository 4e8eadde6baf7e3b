//! Harvest coordinator - main orchestration logic
//!
//! This module runs a whole harvest:
//! - Setting up the output directory, capture folder, artifact and session pool
//! - Discovering manufacturers for every keyword with one pooled session
//! - Fanning (keyword, manufacturer) pairs out across a bounded set of workers
//! - Joining every worker, then finalizing the artifact exactly once
//! - Tearing the session pool down on every exit path

use crate::config::{Config, SessionBackend};
use crate::crawler::discovery::Discovery;
use crate::crawler::extractor::{Extractor, ManufacturerTarget};
use crate::output::{
    generate_markdown_summary, CaptureStore, RecordSink, RetryPolicy, RunStatistics, TableSink,
};
use crate::session::{build_http_client, ChromeSession, HttpSession, Session, SessionPool};
use crate::url::RedirectRule;
use crate::{HarvestError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Trims keywords, dropping empty and repeated ones while keeping order
pub fn normalize_keywords<I>(keywords: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();
    for keyword in keywords {
        let keyword = keyword.as_ref().trim();
        if keyword.is_empty() {
            tracing::warn!("Empty search keyword encountered. Skipping...");
            continue;
        }
        if seen.insert(keyword.to_string()) {
            normalized.push(keyword.to_string());
        } else {
            tracing::debug!("Skipping repeated keyword '{}'", keyword);
        }
    }
    normalized
}

/// Main harvest coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    pool: SessionPool,
    sink: Arc<TableSink>,
    captures: Arc<CaptureStore>,
    discovery: Discovery,
    extractor: Arc<Extractor>,
    stats: RunStatistics,
}

impl Coordinator {
    /// Creates a coordinator backed by the configured session backend
    ///
    /// Chrome sessions are launched up front, one browser per pooled session.
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Output directory and session pool are ready
    /// * `Err(HarvestError)` - Setup failed; nothing was harvested
    pub fn new(config: Config) -> Result<Self> {
        let page_timeout = config.crawler.page_timeout();
        let poll_interval = config.crawler.poll_interval();
        let size = config.crawler.session_count();

        let pool = match config.browser.backend {
            SessionBackend::Chrome => {
                tracing::info!("Launching {} Chrome session(s)", size);
                SessionPool::build(size, |id| {
                    ChromeSession::launch(
                        id,
                        &config.browser,
                        &config.user_agent,
                        page_timeout,
                        poll_interval,
                    )
                    .map(|session| Box::new(session) as Box<dyn Session>)
                })
            }
            SessionBackend::Http => {
                let client = build_http_client(&config.user_agent, page_timeout).map_err(|e| {
                    HarvestError::Setup(format!("failed to build HTTP client: {}", e))
                })?;
                SessionPool::build(size, |id| {
                    Ok(Box::new(HttpSession::new(id, client.clone(), poll_interval))
                        as Box<dyn Session>)
                })
            }
        }
        .map_err(|e| HarvestError::Setup(format!("failed to create session pool: {}", e)))?;

        Self::with_pool(config, pool)
    }

    /// Creates a coordinator using an existing session pool
    pub fn with_pool(config: Config, pool: SessionPool) -> Result<Self> {
        let output_dir = PathBuf::from(&config.output.directory);
        std::fs::create_dir_all(&output_dir).map_err(|e| {
            HarvestError::Setup(format!(
                "failed to create output directory {}: {}",
                output_dir.display(),
                e
            ))
        })?;

        let captures = CaptureStore::create(&output_dir, &config.output.screenshot_folder)
            .map_err(|e| HarvestError::Setup(format!("failed to create capture folder: {}", e)))?;
        let captures = Arc::new(captures);
        let sink = Arc::new(TableSink::new(&output_dir, &config.output.artifact_name));

        let discovery = Discovery::new(&config.site, config.crawler.page_timeout())?;
        let extractor = Arc::new(Extractor::new(
            &config.site,
            Arc::clone(&sink) as Arc<dyn RecordSink>,
            Arc::clone(&captures),
            config.crawler.page_timeout(),
            config.crawler.max_pages,
        ));

        tracing::info!(
            "Session pool ready with {} session(s), {} worker(s)",
            pool.size(),
            config.crawler.workers
        );

        Ok(Self {
            config: Arc::new(config),
            pool,
            sink,
            captures,
            discovery,
            extractor,
            stats: RunStatistics::start(),
        })
    }

    /// Replaces the redirect rule used by discovery
    pub fn with_redirect_rule(mut self, rule: Arc<dyn RedirectRule>) -> Result<Self> {
        self.discovery =
            Discovery::with_rule(&self.config.site, rule, self.config.crawler.page_timeout())?;
        Ok(self)
    }

    /// Records the configuration hash in the run statistics
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.stats.config_hash = Some(hash.into());
        self
    }

    /// Runs the harvest for `keywords`
    ///
    /// The session pool is cleaned up whether or not the harvest succeeds.
    pub async fn run(
        mut self,
        keywords: &[String],
        retry: Box<dyn RetryPolicy>,
    ) -> Result<RunStatistics> {
        let outcome = self.harvest(keywords, retry).await;
        self.pool.cleanup().await;
        self.stats.finish();

        outcome?;

        if let Some(summary_path) = &self.config.output.summary_path {
            match generate_markdown_summary(&self.stats, Path::new(summary_path)) {
                Ok(()) => tracing::info!("Summary written to {}", summary_path),
                Err(e) => tracing::warn!("Failed to write summary to {}: {}", summary_path, e),
            }
        }
        Ok(self.stats)
    }

    async fn harvest(&mut self, keywords: &[String], retry: Box<dyn RetryPolicy>) -> Result<()> {
        let keywords = normalize_keywords(keywords);
        if keywords.is_empty() {
            tracing::warn!("No keywords provided. Skipping data fetch.");
            return Ok(());
        }
        tracing::info!("Fetching and saving data for keywords: {}", keywords.join(", "));
        self.stats.keywords_searched = keywords.len();

        let targets = self.discover(&keywords).await?;
        self.stats.manufacturers_discovered = targets.len();
        tracing::info!("Discovered {} manufacturer page(s)", targets.len());

        self.extract_all(targets).await;
        self.finalize(retry).await;
        Ok(())
    }

    /// Runs discovery sequentially with a single leased session
    async fn discover(&self, keywords: &[String]) -> Result<Vec<ManufacturerTarget>> {
        let mut lease = self.pool.acquire().await?;
        let outcomes = self.discovery.discover_all(&mut *lease, keywords).await;
        drop(lease);

        Ok(outcomes
            .into_iter()
            .flat_map(|outcome| {
                let keyword = outcome.keyword;
                outcome.urls.into_iter().map(move |url| ManufacturerTarget {
                    keyword: keyword.clone(),
                    url,
                })
            })
            .collect())
    }

    /// Processes every target, at most `workers` at a time, and waits for all of them
    async fn extract_all(&mut self, targets: Vec<ManufacturerTarget>) {
        let workers = Arc::new(Semaphore::new(self.config.crawler.workers as usize));
        let mut tasks = JoinSet::new();

        for target in targets {
            let workers = Arc::clone(&workers);
            let pool = self.pool.clone();
            let extractor = Arc::clone(&self.extractor);

            tasks.spawn(async move {
                let _permit = workers
                    .acquire_owned()
                    .await
                    .map_err(|e| HarvestError::Task(e.to_string()))?;
                let mut lease = pool.acquire().await?;
                tracing::debug!(
                    "Session {} processing {} for '{}'",
                    lease.id(),
                    target.url,
                    target.keyword
                );
                Ok::<_, HarvestError>(extractor.run(&mut *lease, &target).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(report)) => self.stats.record_extraction(&report),
                Ok(Err(e)) => {
                    tracing::error!("Task raised an error: {}", e);
                    self.stats.record_task_failure();
                }
                Err(e) => {
                    if e.is_panic() {
                        tracing::error!("Task panicked: {}", e);
                    } else {
                        tracing::error!("Task was cancelled: {}", e);
                    }
                    self.stats.record_task_failure();
                }
            }
        }
        tracing::info!("All tasks completed");
    }

    /// Writes the artifact on a blocking thread; the retry policy may prompt
    async fn finalize(&mut self, mut retry: Box<dyn RetryPolicy>) {
        let sink = Arc::clone(&self.sink);
        let finalized = tokio::task::spawn_blocking(move || sink.finalize(retry.as_mut())).await;

        match finalized {
            Ok(Ok(path)) => self.stats.artifact = Some(path),
            Ok(Err(e)) => tracing::error!(
                "Artifact was not saved ({} row(s) kept in memory): {}",
                self.sink.row_count(),
                e
            ),
            Err(e) => tracing::error!("Finalize task failed: {}", e),
        }
    }

    pub fn sink(&self) -> &TableSink {
        &self.sink
    }

    pub fn captures(&self) -> &CaptureStore {
        &self.captures
    }
}

/// Runs a complete harvest operation
///
/// This function orchestrates the entire harvest:
///
/// 1. Normalize keywords; with none left the run is a no-op
/// 2. Create the output directory, capture folder and session pool
/// 3. Discover manufacturers for every keyword
/// 4. Extract every manufacturer in parallel
/// 5. Finalize the artifact and clean up the pool
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `keywords` - Search keywords
/// * `retry` - Policy consulted when the artifact cannot be written
///
/// # Example
///
/// ```no_run
/// use parts_harvester::config::load_config;
/// use parts_harvester::crawler::run_harvest;
/// use parts_harvester::output::OperatorPrompt;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let keywords = vec!["0986494104".to_string()];
/// run_harvest(config, &keywords, Box::new(OperatorPrompt::new())).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(
    config: Config,
    keywords: &[String],
    retry: Box<dyn RetryPolicy>,
) -> Result<RunStatistics> {
    if normalize_keywords(keywords).is_empty() {
        tracing::warn!("No keywords provided. Skipping data fetch.");
        let mut stats = RunStatistics::start();
        stats.finish();
        return Ok(stats);
    }

    Coordinator::new(config)?.run(keywords, retry).await
}
