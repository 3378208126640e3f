//! Sitemap work queue and prioritization
//!
//! This module handles:
//! - Ordering of sitemap documents waiting to be fetched
//! - Classifying nested sitemaps as high-value, normal or low-value
//! - Front-of-queue insertion for high-value sitemaps so content-bearing
//!   sitemaps are sampled before the cap is reached

use crate::url::lowercase_path;
use regex::Regex;
use std::collections::VecDeque;
use std::sync::LazyLock;

/// Paths that usually hold the content pages worth auditing
static HIGH_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)post|page|product|service|landing").expect("valid high-value pattern")
});

/// Paths that usually hold taxonomy or archive listings
static LOW_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)tag|author|archive|date|20\d\d").expect("valid low-value pattern")
});

/// Scheduling class for a nested sitemap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapPriority {
    /// Inserted at the front of the queue
    High,
    /// Appended in discovery order
    Normal,
    /// Appended after the normal sitemaps of the same index
    Low,
}

impl SitemapPriority {
    /// Classifies a sitemap URL by its path
    ///
    /// A path matching both the high- and low-value patterns
    /// (`/post-tag-sitemap.xml`) is treated as normal. URLs that do not parse
    /// are matched on their raw text.
    pub fn classify(url: &str) -> Self {
        let path = lowercase_path(url).unwrap_or_else(|| url.to_ascii_lowercase());
        let high = HIGH_VALUE.is_match(&path);
        let low = LOW_VALUE.is_match(&path);

        match (high, low) {
            (true, false) => Self::High,
            (false, true) => Self::Low,
            _ => Self::Normal,
        }
    }
}

/// FIFO queue of sitemap URLs with front insertion for high-value entries
#[derive(Debug, Default)]
pub struct SitemapQueue {
    queue: VecDeque<String>,
}

impl SitemapQueue {
    /// Creates a queue seeded with one URL
    pub fn seeded(url: impl Into<String>) -> Self {
        let mut queue = VecDeque::new();
        queue.push_back(url.into());
        Self { queue }
    }

    /// Inserts the children of one sitemap index
    ///
    /// High-value children go to the front in their listed order. Normal
    /// children are appended next, then low-value children.
    pub fn insert_children(&mut self, children: Vec<String>) {
        let mut high = Vec::new();
        let mut normal = Vec::new();
        let mut low = Vec::new();

        for child in children {
            match SitemapPriority::classify(&child) {
                SitemapPriority::High => high.push(child),
                SitemapPriority::Normal => normal.push(child),
                SitemapPriority::Low => low.push(child),
            }
        }

        for child in high.into_iter().rev() {
            self.queue.push_front(child);
        }
        self.queue.extend(normal);
        self.queue.extend(low);
    }

    /// Removes and returns the next URL to fetch
    pub fn pop(&mut self) -> Option<String> {
        self.queue.pop_front()
    }

    /// Returns the number of queued URLs
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_high_value() {
        assert_eq!(
            SitemapPriority::classify("https://x.com/post-sitemap.xml"),
            SitemapPriority::High
        );
        assert_eq!(
            SitemapPriority::classify("https://x.com/product-sitemap2.xml"),
            SitemapPriority::High
        );
        assert_eq!(
            SitemapPriority::classify("https://x.com/sitemaps/LANDING.xml"),
            SitemapPriority::High
        );
    }

    #[test]
    fn test_classify_low_value() {
        assert_eq!(
            SitemapPriority::classify("https://x.com/tags.xml"),
            SitemapPriority::Low
        );
        assert_eq!(
            SitemapPriority::classify("https://x.com/author-sitemap.xml"),
            SitemapPriority::Low
        );
        assert_eq!(
            SitemapPriority::classify("https://x.com/sitemap-2021-03.xml"),
            SitemapPriority::Low
        );
    }

    #[test]
    fn test_classify_mixed_and_plain() {
        assert_eq!(
            SitemapPriority::classify("https://x.com/post-tag-sitemap.xml"),
            SitemapPriority::Normal
        );
        assert_eq!(
            SitemapPriority::classify("https://x.com/sitemap-misc.xml"),
            SitemapPriority::Normal
        );
    }

    #[test]
    fn test_host_does_not_affect_class() {
        // "tagmanager" in the host must not demote the sitemap
        assert_eq!(
            SitemapPriority::classify("https://tagmanager.example.com/sitemap-misc.xml"),
            SitemapPriority::Normal
        );
    }

    #[test]
    fn test_high_value_jumps_queue() {
        let mut queue = SitemapQueue::seeded("https://x.com/existing.xml");
        queue.insert_children(vec![
            "https://x.com/tags.xml".to_string(),
            "https://x.com/misc.xml".to_string(),
            "https://x.com/posts.xml".to_string(),
            "https://x.com/pages.xml".to_string(),
        ]);

        let order: Vec<String> = std::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(
            order,
            vec![
                "https://x.com/posts.xml",
                "https://x.com/pages.xml",
                "https://x.com/existing.xml",
                "https://x.com/misc.xml",
                "https://x.com/tags.xml",
            ]
        );
    }

    #[test]
    fn test_len() {
        let mut queue = SitemapQueue::default();
        assert!(queue.is_empty());

        queue.insert_children(vec!["https://x.com/a.xml".to_string()]);
        assert_eq!(queue.len(), 1);
        assert!(!queue.is_empty());
    }
}
