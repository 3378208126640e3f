use crate::analysis::AnalysisType;
use crate::config::types::{
    AnalysisConfig, BatchConfig, Config, CrawlerConfig, GatewayConfig, ProxyConfig,
};
use crate::gateway::ProviderConfig;
use crate::ConfigError;
use url::Url;

/// Placeholder replaced by the encoded target URL in proxy templates
pub const URL_PLACEHOLDER: &str = "{url}";

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_proxy_config(&config.proxy)?;
    validate_provider_endpoint(&config.provider)?;
    validate_gateway_config(&config.gateway)?;
    validate_batch_config(&config.batch)?;
    validate_analysis_config(&config.analysis)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_sitemaps < 1 || config.max_concurrent_sitemaps > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_sitemaps must be between 1 and 100, got {}",
            config.max_concurrent_sitemaps
        )));
    }

    if config.max_url_sample_size < 1 {
        return Err(ConfigError::Validation(
            "max_url_sample_size must be >= 1".to_string(),
        ));
    }

    if config.crawl_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "crawl_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the proxy template list
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    if config.templates.is_empty() {
        return Err(ConfigError::Validation(
            "at least one proxy template is required".to_string(),
        ));
    }

    for template in &config.templates {
        validate_proxy_template(template)?;
    }

    Ok(())
}

/// Validates a single proxy template
///
/// The template must contain the `{url}` placeholder and must form an
/// http(s) URL once the placeholder is filled in.
pub fn validate_proxy_template(template: &str) -> Result<(), ConfigError> {
    if !template.contains(URL_PLACEHOLDER) {
        return Err(ConfigError::Validation(format!(
            "Proxy template '{}' must contain the {} placeholder",
            template, URL_PLACEHOLDER
        )));
    }

    let sample = template.replace(URL_PLACEHOLDER, "sample");
    let url = Url::parse(&sample)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy template '{}': {}", template, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Proxy template '{}' must use http or https",
            template
        )));
    }

    Ok(())
}

/// Validates the optional provider endpoint override
///
/// The credential is checked separately, once command-line overrides have
/// been applied.
fn validate_provider_endpoint(config: &ProviderConfig) -> Result<(), ConfigError> {
    if let Some(base_url) = &config.base_url {
        Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;
    }

    if let Some(model) = &config.model {
        if model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "model cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates the provider credential
pub fn validate_credential(config: &ProviderConfig) -> Result<(), ConfigError> {
    if config.api_key.trim().is_empty() {
        return Err(ConfigError::MissingCredential(config.kind.to_string()));
    }
    Ok(())
}

fn validate_gateway_config(config: &GatewayConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }
    Ok(())
}

fn validate_batch_config(config: &BatchConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 {
        return Err(ConfigError::Validation(
            "batch_size must be >= 1".to_string(),
        ));
    }

    if config.concurrent_batches < 1 {
        return Err(ConfigError::Validation(
            "concurrent_batches must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_analysis_config(config: &AnalysisConfig) -> Result<(), ConfigError> {
    if config.kind == AnalysisType::Local
        && config
            .location
            .as_deref()
            .map_or(true, |l| l.trim().is_empty())
    {
        return Err(ConfigError::Validation(
            "a location is required for local analyses".to_string(),
        ));
    }
    Ok(())
}
