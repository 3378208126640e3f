//! Configuration module for the orchestrator
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use seo_orchestrator::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("orchestrator.toml")).unwrap();
//! println!("Sampling cap: {}", config.crawler.max_url_sample_size);
//! ```

mod parser;
mod types;
pub mod validation;

// Re-export types
pub use types::{AnalysisConfig, BatchConfig, Config, CrawlerConfig, GatewayConfig, ProxyConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
