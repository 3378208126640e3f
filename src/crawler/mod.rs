//! Crawler module for sitemap discovery
//!
//! This module contains the core crawling logic, including:
//! - Fetching documents through forwarding proxies with failover
//! - Sitemap XML parsing
//! - Queue prioritization for nested sitemaps
//! - Overall crawl coordination under a worker cap, sampling cap and deadline

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;

pub use coordinator::{Coordinator, CrawlOutcome};
pub use fetcher::{build_http_client, proxied_url, ProxyFetcher};
pub use parser::{parse_sitemap, SitemapDocument, SitemapParseError};
pub use scheduler::{SitemapPriority, SitemapQueue};

use crate::config::{CrawlerConfig, ProxyConfig};
use crate::events::EventSender;
use crate::OrchestratorError;

/// Runs a complete sitemap crawl
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP client and proxy fetcher
/// 2. Seed the queue with `seed`
/// 3. Fetch and parse sitemaps with at most
///    `max-concurrent-sitemaps` in flight
/// 4. Follow nested sitemaps, high-value ones first
/// 5. Collect page URLs until the sampling cap or the deadline
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `proxy` - The proxy template list
/// * `seed` - The initial sitemap URL
/// * `events` - Optional progress channel
///
/// # Returns
///
/// * `Ok(CrawlOutcome)` - The page sample, possibly partial
/// * `Err(OrchestratorError)` - The seed sitemap could not be fetched
pub async fn crawl(
    config: &CrawlerConfig,
    proxy: &ProxyConfig,
    seed: &str,
    events: Option<EventSender>,
) -> Result<CrawlOutcome, OrchestratorError> {
    Coordinator::new(config, proxy, events)?.run(seed).await
}
