//! Proxy fetch layer
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and timeout
//! - Rewriting a target URL through each forwarding proxy template
//! - Failing over to the next template on any non-2xx status or transport error
//! - Bounding every attempt by the crawl deadline

use crate::config::{validation::URL_PLACEHOLDER, CrawlerConfig, ProxyConfig};
use crate::FetchError;
use reqwest::Client;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

/// Builds the HTTP client used for sitemap requests
///
/// # Arguments
///
/// * `config` - The crawler configuration (user agent and request timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Rewrites `target` through one proxy template
///
/// The `{url}` placeholder is replaced by the percent-encoded target.
///
/// # Example
///
/// ```
/// use seo_orchestrator::crawler::proxied_url;
///
/// let url = proxied_url("https://proxy.test/raw?url={url}", "https://x.com/a b.xml").unwrap();
/// assert_eq!(url, "https://proxy.test/raw?url=https%3A%2F%2Fx.com%2Fa+b.xml");
/// ```
pub fn proxied_url(template: &str, target: &str) -> Result<String, FetchError> {
    if !template.contains(URL_PLACEHOLDER) {
        return Err(FetchError::InvalidTemplate(template.to_string()));
    }

    let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    Ok(template.replace(URL_PLACEHOLDER, &encoded))
}

/// Fetches documents through an ordered list of forwarding proxies
#[derive(Debug, Clone)]
pub struct ProxyFetcher {
    client: Client,
    templates: Vec<String>,
}

impl ProxyFetcher {
    /// Creates a fetcher over an existing client
    pub fn new(client: Client, templates: Vec<String>) -> Self {
        Self { client, templates }
    }

    /// Creates a fetcher from configuration
    pub fn from_config(crawler: &CrawlerConfig, proxy: &ProxyConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(crawler)?, proxy.templates.clone()))
    }

    /// Fetches `target` through the proxy list
    ///
    /// # Failover
    ///
    /// | Outcome | Action |
    /// |---------|--------|
    /// | HTTP 2xx | Return the body |
    /// | Any other HTTP status | Next template |
    /// | Transport error or request timeout | Next template |
    /// | Crawl deadline reached | Return `DeadlineExceeded` |
    /// | Every template tried | Return `ProxiesExhausted` |
    ///
    /// Each template is tried at most once, in order. A proxy that cannot
    /// reach the target often answers with its own 404 or 400, so no status
    /// ends the walk early.
    ///
    /// # Arguments
    ///
    /// * `target` - The document URL
    /// * `deadline` - The crawl deadline; no attempt runs past it
    pub async fn fetch_through_proxies(
        &self,
        target: &str,
        deadline: Instant,
    ) -> Result<String, FetchError> {
        for (index, template) in self.templates.iter().enumerate() {
            if Instant::now() >= deadline {
                return Err(FetchError::DeadlineExceeded {
                    url: target.to_string(),
                });
            }

            let proxied = proxied_url(template, target)?;
            tracing::debug!("Fetching {} via proxy {}", target, index + 1);

            let response = match timeout_at(deadline, self.client.get(&proxied).send()).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    tracing::warn!("Proxy {} failed for {}: {}", index + 1, target, e);
                    continue;
                }
                Err(_) => {
                    return Err(FetchError::DeadlineExceeded {
                        url: target.to_string(),
                    })
                }
            };

            let status = response.status();
            if !status.is_success() {
                tracing::warn!(
                    "Proxy {} returned {} for {}, trying next",
                    index + 1,
                    status.as_u16(),
                    target
                );
                continue;
            }

            match timeout_at(deadline, response.text()).await {
                Ok(Ok(body)) => return Ok(body),
                Ok(Err(e)) => {
                    tracing::warn!("Proxy {} body read failed for {}: {}", index + 1, target, e);
                }
                Err(_) => {
                    return Err(FetchError::DeadlineExceeded {
                        url: target.to_string(),
                    })
                }
            }
        }

        Err(FetchError::ProxiesExhausted {
            url: target.to_string(),
            attempts: self.templates.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&CrawlerConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_proxied_url_encodes_target() {
        let url = proxied_url(
            "https://corsproxy.io/?{url}",
            "https://x.com/sitemap.xml?page=2",
        )
        .unwrap();
        assert_eq!(
            url,
            "https://corsproxy.io/?https%3A%2F%2Fx.com%2Fsitemap.xml%3Fpage%3D2"
        );
    }

    #[test]
    fn test_proxied_url_requires_placeholder() {
        let result = proxied_url("https://proxy.test/fetch/", "https://x.com/");
        assert!(matches!(result, Err(FetchError::InvalidTemplate(_))));
    }

    #[tokio::test]
    async fn test_no_templates_is_exhausted() {
        let fetcher = ProxyFetcher::new(Client::new(), Vec::new());
        let deadline = Instant::now() + Duration::from_secs(5);
        let result = fetcher
            .fetch_through_proxies("https://x.com/sitemap.xml", deadline)
            .await;
        assert!(matches!(
            result,
            Err(FetchError::ProxiesExhausted { attempts: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_expired_deadline_fails_before_request() {
        let fetcher = ProxyFetcher::new(
            Client::new(),
            vec!["http://127.0.0.1:9/?{url}".to_string()],
        );
        let result = fetcher
            .fetch_through_proxies("https://x.com/sitemap.xml", Instant::now())
            .await;
        assert!(matches!(result, Err(FetchError::DeadlineExceeded { .. })));
    }
}
