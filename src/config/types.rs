use crate::analysis::AnalysisType;
use crate::gateway::ProviderConfig;
use serde::Deserialize;

/// Main configuration structure for the orchestrator
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Sitemap crawl configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of sitemap documents fetched at once
    #[serde(rename = "max-concurrent-sitemaps")]
    pub max_concurrent_sitemaps: u32,

    /// Page URLs collected before the crawl stops admitting new work
    #[serde(rename = "max-url-sample-size")]
    pub max_url_sample_size: usize,

    /// Hard deadline for the whole crawl (seconds)
    #[serde(rename = "crawl-timeout-secs")]
    pub crawl_timeout_secs: u64,

    /// Timeout for a single proxied request (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// User agent sent with every sitemap request
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sitemaps: 12,
            max_url_sample_size: 600,
            crawl_timeout_secs: 120,
            request_timeout_secs: 30,
            user_agent: format!("seo-orchestrator/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Forwarding proxy configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Ordered proxy URL templates; `{url}` is replaced by the encoded target
    pub templates: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            templates: vec![
                "https://corsproxy.io/?{url}".to_string(),
                "https://api.allorigins.win/raw?url={url}".to_string(),
                "https://thingproxy.freeboard.io/fetch/{url}".to_string(),
            ],
        }
    }
}

/// Retry behaviour for model-provider calls
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Total attempts per call, including the first
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Delay before a retry (milliseconds); rate limits grow it exponentially
    #[serde(rename = "base-delay-ms")]
    pub base_delay_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
        }
    }
}

/// Implementation-guide batching
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Tasks per model call
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Batch calls in flight at once
    #[serde(rename = "concurrent-batches")]
    pub concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            concurrent_batches: 3,
        }
    }
}

/// Targeting for the analysis prompts
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub kind: AnalysisType,

    /// Target location, required for local analyses
    pub location: Option<String>,
}
