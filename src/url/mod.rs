//! URL handling for sitemap locations
//!
//! This module turns raw `<loc>` text into normalized URLs and exposes the
//! path helpers shared by the crawl scheduler and the importance scorer.

mod normalize;

pub use normalize::normalize_url;

use url::Url;

/// Returns the non-empty path segments of a URL
///
/// `https://example.com/blog/2019/post/` yields `["blog", "2019", "post"]`.
pub fn path_segments(url: &Url) -> Vec<&str> {
    url.path().split('/').filter(|s| !s.is_empty()).collect()
}

/// Returns the lowercased path of a URL string, or `None` if it does not parse
pub fn lowercase_path(raw: &str) -> Option<String> {
    Url::parse(raw).ok().map(|u| u.path().to_ascii_lowercase())
}
