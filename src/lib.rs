//! SEO Orchestrator: sitemap-driven site audits
//!
//! This crate crawls a sitemap tree through forwarding proxies, ranks the
//! discovered pages by estimated importance, and drives them through a series
//! of model-provider calls to assemble a multi-stage SEO report.

pub mod analysis;
pub mod config;
pub mod crawler;
pub mod events;
pub mod gateway;
pub mod pipeline;
pub mod plan;
pub mod scoring;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for orchestrator operations
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crawl complete, but no URLs were found. Your sitemap might be empty or in a format that could not be parsed.")]
    EmptyCrawl,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("No API key configured for provider {0}")]
    MissingCredential(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Errors raised while fetching a document through the proxy list
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to fetch {url} after trying all {attempts} proxy providers")]
    ProxiesExhausted { url: String, attempts: usize },

    #[error("Crawl deadline expired while fetching {url}")]
    DeadlineExceeded { url: String },

    #[error("Invalid proxy template: {0}")]
    InvalidTemplate(String),
}

/// Errors raised by the model-provider gateway
///
/// Transport and provider variants come from the network call itself; the
/// remaining variants describe what was wrong with the returned text.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{provider} returned HTTP {status}: {message}")]
    Provider {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Request to {provider} failed: {source}")]
    Transport {
        provider: String,
        source: reqwest::Error,
    },

    #[error("The AI returned an empty or invalid response for {context}")]
    EmptyResponse { context: String },

    #[error("The AI returned a blocking error: \"{excerpt}...\"")]
    Blocked { excerpt: String },

    #[error("Could not find a valid JSON object in the AI's response for {context}")]
    NoJson { context: String },

    #[error("The AI returned a malformed JSON object for {context}: {source}")]
    MalformedJson {
        context: String,
        source: serde_json::Error,
    },

    #[error("The AI returned a JSON object with a missing or incorrect structure for {context}: {detail}")]
    WrongShape { context: String, detail: String },

    #[error("No API key configured for provider {provider}")]
    MissingCredential { provider: String },
}

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

/// Result type alias for gateway operations
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, CrawlOutcome};
pub use gateway::{Gateway, ProviderConfig, ProviderKind};
pub use pipeline::{run_pipeline, PipelineFailure, PipelineReport, PipelineRequest};
pub use scoring::{rank_urls, score_url, ScoredUrl};
