//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates the sitemap crawl:
//! - Owning the crawl state (queue, dedup sets, page sample, counters)
//! - Keeping a bounded pool of fetch+parse workers busy
//! - Applying worker results between completions
//! - Enforcing the sampling cap and the crawl deadline
//! - Emitting progress events

use crate::config::{CrawlerConfig, ProxyConfig};
use crate::crawler::fetcher::ProxyFetcher;
use crate::crawler::parser::{parse_sitemap, SitemapDocument, SitemapParseError};
use crate::events::{emit, CrawlPhase, EventSender, ProgressEvent};
use crate::state::CrawlState;
use crate::url::normalize_url;
use crate::{FetchError, OrchestratorError};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use url::Url;

/// Result of a finished crawl
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlOutcome {
    /// Unique normalized page URLs in discovery order
    pub pages: Vec<String>,

    /// Whether the sampling cap cut the crawl short
    pub sampled: bool,

    /// Whether the crawl deadline expired with work outstanding
    pub timed_out: bool,

    /// Sitemap documents whose processing finished
    pub sitemaps_processed: usize,

    /// Sitemap documents that could not be fetched or parsed
    pub failed_sitemaps: usize,
}

/// Why a single sitemap yielded nothing
#[derive(Debug, Error)]
enum SitemapFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] SitemapParseError),

    #[error("Invalid sitemap URL: {0}")]
    Url(#[from] url::ParseError),
}

/// What a worker hands back to the coordinator
#[derive(Debug)]
struct SitemapResult {
    url: String,
    result: Result<SitemapDocument, SitemapFailure>,
}

/// Fetches and parses one sitemap; touches no crawl state
async fn process_sitemap(fetcher: Arc<ProxyFetcher>, url: String, deadline: Instant) -> SitemapResult {
    let result = fetch_and_parse(&fetcher, &url, deadline).await;
    SitemapResult { url, result }
}

async fn fetch_and_parse(
    fetcher: &ProxyFetcher,
    url: &str,
    deadline: Instant,
) -> Result<SitemapDocument, SitemapFailure> {
    let base = Url::parse(url)?;
    let body = fetcher.fetch_through_proxies(url, deadline).await?;
    Ok(parse_sitemap(&body, &base)?)
}

/// Main crawler coordinator structure
pub struct Coordinator {
    fetcher: Arc<ProxyFetcher>,
    max_workers: usize,
    sample_cap: usize,
    timeout: Duration,
    events: Option<EventSender>,
}

impl Coordinator {
    /// Creates a new coordinator
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `proxy` - The proxy template list
    /// * `events` - Optional progress channel
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(OrchestratorError)` - The HTTP client could not be built
    pub fn new(
        config: &CrawlerConfig,
        proxy: &ProxyConfig,
        events: Option<EventSender>,
    ) -> Result<Self, OrchestratorError> {
        let fetcher = ProxyFetcher::from_config(config, proxy)?;
        Ok(Self::with_fetcher(fetcher, config, events))
    }

    /// Creates a coordinator over an existing fetcher
    pub fn with_fetcher(
        fetcher: ProxyFetcher,
        config: &CrawlerConfig,
        events: Option<EventSender>,
    ) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            max_workers: (config.max_concurrent_sitemaps as usize).max(1),
            sample_cap: config.max_url_sample_size,
            timeout: Duration::from_secs(config.crawl_timeout_secs),
            events,
        }
    }

    /// Runs the crawl loop from a seed sitemap
    ///
    /// The loop alternates between filling the worker pool from the queue
    /// and applying one completed worker result. It ends when the queue is
    /// empty (or the cap is reached) and no worker is active, or when the
    /// deadline expires; on expiry in-flight workers are aborted and the
    /// sample gathered so far is returned.
    ///
    /// # Errors
    ///
    /// Fails only when the seed URL is invalid or the seed sitemap cannot be
    /// fetched through any proxy.
    pub async fn run(&self, seed: &str) -> Result<CrawlOutcome, OrchestratorError> {
        let seed = normalize_url(seed, None)?.to_string();
        let deadline = Instant::now() + self.timeout;
        let start_time = std::time::Instant::now();

        tracing::info!(
            "Starting sitemap crawl at {} ({} workers, cap {})",
            seed,
            self.max_workers,
            self.sample_cap
        );

        let mut state = CrawlState::new(seed.clone(), self.sample_cap);
        let mut workers = JoinSet::new();
        let mut failed_sitemaps = 0;
        let mut timed_out = false;

        loop {
            // Phase 1: fill worker pool
            while workers.len() < self.max_workers {
                match state.next_sitemap() {
                    Some(url) => {
                        tracing::debug!("Dispatching sitemap {}", url);
                        workers.spawn(process_sitemap(Arc::clone(&self.fetcher), url, deadline));
                    }
                    None => break,
                }
            }

            // Phase 2: check for completion
            if workers.is_empty() {
                break;
            }

            // Phase 3: collect one completed worker, or hit the deadline
            let joined = tokio::select! {
                joined = workers.join_next() => joined,
                _ = sleep_until(deadline) => {
                    tracing::warn!(
                        "Crawl deadline reached with {} sitemaps in flight and {} queued",
                        workers.len(),
                        state.queued()
                    );
                    workers.abort_all();
                    timed_out = true;
                    break;
                }
            };

            let Some(joined) = joined else {
                break;
            };

            let finished = match joined {
                Ok(SitemapResult { url, result }) => {
                    match result {
                        Ok(document) => self.apply_document(&mut state, &url, document),
                        Err(SitemapFailure::Fetch(FetchError::DeadlineExceeded { .. })) => {
                            tracing::debug!("Deadline reached while fetching {}", url);
                            failed_sitemaps += 1;
                        }
                        Err(SitemapFailure::Fetch(e)) if url == seed => {
                            tracing::error!("Seed sitemap {} is unreachable: {}", url, e);
                            workers.abort_all();
                            return Err(e.into());
                        }
                        Err(e) => {
                            tracing::warn!("Skipping sitemap {}: {}", url, e);
                            failed_sitemaps += 1;
                        }
                    }
                    url
                }
                Err(e) => {
                    tracing::error!("Sitemap worker failed: {}", e);
                    failed_sitemaps += 1;
                    String::new()
                }
            };

            state.finish_sitemap();
            emit(
                self.events.as_ref(),
                ProgressEvent::Crawl(state.progress(CrawlPhase::SitemapProcessed, &finished, None)),
            );
        }

        let outcome = CrawlOutcome {
            sampled: state.is_sampled(),
            timed_out,
            sitemaps_processed: state.processed_count(),
            failed_sitemaps,
            pages: state.into_pages(),
        };

        tracing::info!(
            "Crawl completed: {} pages from {} sitemaps ({} failed) in {:?}",
            outcome.pages.len(),
            outcome.sitemaps_processed,
            outcome.failed_sitemaps,
            start_time.elapsed()
        );
        if outcome.sampled {
            tracing::info!("Sampling cap of {} reached", self.sample_cap);
        }

        Ok(outcome)
    }

    /// Applies one parsed sitemap to the crawl state
    fn apply_document(&self, state: &mut CrawlState, url: &str, document: SitemapDocument) {
        match document {
            SitemapDocument::Index(children) => {
                let listed = children.len();
                let admitted = state.admit_children(children);
                tracing::debug!(
                    "Sitemap index {} listed {} sitemaps ({} new)",
                    url,
                    listed,
                    admitted
                );
            }
            SitemapDocument::UrlSet(pages) => {
                let listed = pages.len();
                let added = state.record_pages(pages);
                tracing::debug!("URL set {} listed {} pages ({} new)", url, listed, added.len());

                if let Some(last) = added.last() {
                    emit(
                        self.events.as_ref(),
                        ProgressEvent::Crawl(state.progress(
                            CrawlPhase::PagesDiscovered,
                            url,
                            Some(last.clone()),
                        )),
                    );
                }
            }
        }
    }
}
