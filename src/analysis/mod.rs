//! Analysis stages
//!
//! Each stage builds a prompt, sends it through a [`CompletionClient`] with
//! retries and decodes the response into a typed envelope.
//!
//! [`CompletionClient`]: crate::gateway::CompletionClient

mod prompts;
mod stages;
mod types;

pub use stages::{
    discover_competitors, generate_batch_guides, generate_executive_summary,
    generate_implementation_guide, generate_seo_analysis, generate_sitewide_audit,
    GuideTask, MAX_COMPETITORS,
};
pub use types::*;

#[cfg(test)]
pub(crate) use stages::tests as testing;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Geographic targeting of the analysis prompts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    #[default]
    Global,
    Local,
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Local => write!(f, "local"),
        }
    }
}
