use crate::crawler::SitemapQueue;
use crate::events::{CrawlPhase, CrawlProgress};
use std::collections::HashSet;

/// Mutable state of one crawl invocation
///
/// A single owner (the crawl coordinator) holds this value; workers never
/// see it. Every mutation happens between worker completions, so the
/// invariants below hold at each await point:
///
/// - a sitemap URL is handed out by [`CrawlState::next_sitemap`] at most once
/// - the queue never holds a URL that has already been processed
/// - the page sample holds no duplicates and never exceeds the cap
#[derive(Debug)]
pub struct CrawlState {
    /// Every sitemap URL ever admitted (queued, in flight or processed)
    known: HashSet<String>,

    /// Sitemap URLs that have been handed to a worker
    processed: HashSet<String>,

    /// Sitemaps waiting for a worker
    queue: SitemapQueue,

    /// Page URLs in discovery order
    pages: Vec<String>,

    /// Membership index for `pages`
    page_index: HashSet<String>,

    /// Maximum number of page URLs kept
    sample_cap: usize,

    /// Sitemaps whose processing finished
    processed_count: usize,

    /// Whether a urlset offered more URLs than the cap allowed
    truncated: bool,
}

impl CrawlState {
    /// Creates the state for a crawl seeded with one sitemap URL
    pub fn new(seed: impl Into<String>, sample_cap: usize) -> Self {
        let seed = seed.into();
        let mut known = HashSet::new();
        known.insert(seed.clone());

        Self {
            known,
            processed: HashSet::new(),
            queue: SitemapQueue::seeded(seed),
            pages: Vec::new(),
            page_index: HashSet::new(),
            sample_cap,
            processed_count: 0,
            truncated: false,
        }
    }

    /// Hands out the next sitemap to fetch and marks it processed
    ///
    /// Returns `None` when the queue is empty or the sample is full.
    pub fn next_sitemap(&mut self) -> Option<String> {
        if self.cap_reached() {
            return None;
        }

        while let Some(url) = self.queue.pop() {
            if self.processed.insert(url.clone()) {
                return Some(url);
            }
        }

        None
    }

    /// Admits child sitemaps discovered in an index
    ///
    /// Children already known (queued, in flight or processed) are dropped,
    /// as are duplicates within `children`. Returns the number admitted.
    pub fn admit_children(&mut self, children: Vec<String>) -> usize {
        let fresh: Vec<String> = children
            .into_iter()
            .filter(|child| self.known.insert(child.clone()))
            .collect();

        let admitted = fresh.len();
        self.queue.insert_children(fresh);
        admitted
    }

    /// Adds page URLs to the sample, stopping at the cap
    ///
    /// Returns the URLs that were actually added, in order.
    pub fn record_pages(&mut self, urls: Vec<String>) -> Vec<String> {
        let mut added = Vec::new();

        for url in urls {
            if self.page_index.contains(&url) {
                continue;
            }
            if self.cap_reached() {
                self.truncated = true;
                break;
            }
            self.page_index.insert(url.clone());
            self.pages.push(url.clone());
            added.push(url);
        }

        added
    }

    /// Counts one handed-out sitemap as finished
    pub fn finish_sitemap(&mut self) {
        self.processed_count += 1;
    }

    /// Returns whether the page sample is full
    fn cap_reached(&self) -> bool {
        self.pages.len() >= self.sample_cap
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn processed_count(&self) -> usize {
        self.processed_count
    }

    /// Whether the sample stopped short of everything the sitemaps offered
    ///
    /// True when the cap cut a urlset short, or when sitemaps were still
    /// queued at the moment the cap was reached.
    pub fn is_sampled(&self) -> bool {
        self.truncated || (self.cap_reached() && !self.queue.is_empty())
    }

    /// Builds a progress snapshot for the given sitemap
    pub fn progress(
        &self,
        phase: CrawlPhase,
        sitemap: &str,
        last_url_found: Option<String>,
    ) -> CrawlProgress {
        CrawlProgress {
            phase,
            processed: self.processed_count,
            total: self.known.len(),
            current_sitemap: sitemap.to_string(),
            last_url_found,
            pages_found: self.pages.len(),
        }
    }

    /// Consumes the state, returning the page sample in discovery order
    pub fn into_pages(self) -> Vec<String> {
        self.pages
    }
}
