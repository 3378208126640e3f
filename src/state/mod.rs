//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: queue, dedup sets, page sample and counters owned by a
//!   single crawl invocation

mod crawl_state;

pub use crawl_state::CrawlState;
