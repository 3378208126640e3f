//! URL importance scoring
//!
//! A pure heuristic over the discovered page URLs: short commercial and
//! pillar paths rank high, deep dated posts and taxonomy listings rank low,
//! and non-page assets are excluded with a score of zero.

mod weights;

pub use weights::{
    ASSET_EXTENSIONS, BASE_SCORE, DATE_PENALTY, DEPTH_PENALTY, KEYWORD_WEIGHTS, ROOT_BONUS,
};

use crate::url::path_segments;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use url::Url;

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\d{4}/\d{2}").expect("valid date pattern"));

/// A page URL paired with its importance score
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredUrl {
    pub url: String,
    pub score: u32,
}

/// Scores one URL
///
/// # Scoring
///
/// 1. Start from [`BASE_SCORE`]
/// 2. Subtract [`DEPTH_PENALTY`] per path segment
/// 3. Apply every [`KEYWORD_WEIGHTS`] entry found in the lowercased URL
/// 4. Subtract [`DATE_PENALTY`] for a `/yyyy/mm` path
/// 5. Return zero for [`ASSET_EXTENSIONS`]
/// 6. Add [`ROOT_BONUS`] for the root path
///
/// The result is clamped at zero; URLs that do not parse score zero.
///
/// # Example
///
/// ```
/// use seo_orchestrator::score_url;
///
/// assert_eq!(score_url("https://x.com/"), 150);
/// assert_eq!(score_url("https://x.com/pricing"), 107);
/// assert_eq!(score_url("https://x.com/img/logo.png"), 0);
/// ```
pub fn score_url(raw: &str) -> u32 {
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Could not parse URL for scoring {}: {}", raw, e);
            return 0;
        }
    };

    let path = url.path();
    if is_asset(path) {
        return 0;
    }

    let mut score = BASE_SCORE - path_segments(&url).len() as i64 * DEPTH_PENALTY;

    let haystack = raw.to_lowercase();
    score += KEYWORD_WEIGHTS
        .iter()
        .filter(|(keyword, _)| haystack.contains(keyword))
        .map(|(_, weight)| weight)
        .sum::<i64>();

    if DATE_PATTERN.is_match(path) {
        score -= DATE_PENALTY;
    }

    if path == "/" {
        score += ROOT_BONUS;
    }

    u32::try_from(score.max(0)).unwrap_or(u32::MAX)
}

fn is_asset(path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or_default();
    last.rsplit_once('.').is_some_and(|(_, ext)| {
        ASSET_EXTENSIONS
            .iter()
            .any(|asset| asset.eq_ignore_ascii_case(ext))
    })
}

/// Ranks URLs by descending score
///
/// The sort is stable: URLs with equal scores keep their input order.
pub fn rank_urls<S: AsRef<str>>(urls: &[S]) -> Vec<ScoredUrl> {
    let mut scored: Vec<ScoredUrl> = urls
        .iter()
        .map(|url| ScoredUrl {
            url: url.as_ref().to_string(),
            score: score_url(url.as_ref()),
        })
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_scores_highest() {
        assert_eq!(score_url("https://example.com/"), 150);
        assert!(
            score_url("https://example.com/") > score_url("https://example.com/blog/category/tag/post")
        );
    }

    #[test]
    fn test_commercial_and_dated_paths() {
        assert_eq!(score_url("https://x.com/pricing"), 107);
        assert_eq!(score_url("https://x.com/blog/2019/05/post"), 62);
    }

    #[test]
    fn test_assets_score_zero() {
        assert_eq!(score_url("https://x.com/img/logo.png"), 0);
        assert_eq!(score_url("https://x.com/files/Report.PDF"), 0);
        assert_eq!(score_url("https://x.com/static/app.js"), 0);
        assert_ne!(score_url("https://x.com/v1.2/docs"), 0);
    }

    #[test]
    fn test_scores_clamped_at_zero() {
        assert_eq!(
            score_url("https://x.com/legal/terms/policy/tag/category/author/page/9"),
            0
        );
    }

    #[test]
    fn test_unparseable_url_scores_zero() {
        assert_eq!(score_url("not a url"), 0);
    }

    #[test]
    fn test_keywords_match_case_insensitively() {
        assert_eq!(
            score_url("https://x.com/Pricing"),
            score_url("https://x.com/pricing")
        );
    }

    #[test]
    fn test_rank_scenario() {
        let urls = [
            "https://x.com/blog/2019/05/post",
            "https://x.com/img/logo.png",
            "https://x.com/pricing",
            "https://x.com/",
        ];
        let ranked = rank_urls(&urls);
        let order: Vec<&str> = ranked.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "https://x.com/",
                "https://x.com/pricing",
                "https://x.com/blog/2019/05/post",
                "https://x.com/img/logo.png",
            ]
        );
        assert_eq!(ranked[3].score, 0);
    }

    #[test]
    fn test_rank_is_stable_and_deterministic() {
        let urls = vec![
            "https://x.com/a".to_string(),
            "https://x.com/b".to_string(),
            "https://x.com/c".to_string(),
        ];
        let first = rank_urls(&urls);
        let second = rank_urls(&urls);
        assert_eq!(first, second);

        let order: Vec<&str> = first.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(order, vec!["https://x.com/a", "https://x.com/b", "https://x.com/c"]);
    }
}
