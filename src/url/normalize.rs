use crate::UrlError;
use url::Url;

/// Tracking query parameters removed during normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
];

/// Normalizes a sitemap `<loc>` value into the identity used for page URLs
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace (sitemaps often indent `<loc>` text)
/// 2. Parse, resolving against `base` when the value is relative
/// 3. Reject anything that is not http or https
/// 4. Lowercase the host (handled by the parser for http(s))
/// 5. Remove the fragment
/// 6. Remove tracking query parameters and an empty trailing `?`
///
/// Scheme and path are kept as written so the URL shown in reports is the
/// one the site publishes.
///
/// # Examples
///
/// ```
/// use seo_orchestrator::url::normalize_url;
///
/// let url = normalize_url("  https://EXAMPLE.com/pricing?utm_source=x#plans ", None).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/pricing");
/// ```
pub fn normalize_url(raw: &str, base: Option<&Url>) -> Result<Url, UrlError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Malformed("empty location".to_string()));
    }

    let mut url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => match base {
            Some(base) => base.join(raw).map_err(|e| UrlError::Parse(e.to_string()))?,
            None => return Err(UrlError::Parse(format!("relative URL without base: {}", raw))),
        },
        Err(e) => return Err(UrlError::Parse(e.to_string())),
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Ok(url)
}

fn is_tracking_param(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    TRACKING_PARAMS.contains(&lower.as_str()) || lower.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_whitespace() {
        let result = normalize_url("\n   https://example.com/page\n  ", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_keep_root_slash() {
        let result = normalize_url("https://example.com", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.com/page#section", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_remove_tracking_params() {
        let result = normalize_url("https://example.com/page?utm_source=twitter", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_keeps_meaningful_params_in_order() {
        let result =
            normalize_url("https://example.com/list?page=2&utm_medium=email&sort=asc", None)
                .unwrap();
        assert_eq!(result.as_str(), "https://example.com/list?page=2&sort=asc");
    }

    #[test]
    fn test_custom_utm_param() {
        let result = normalize_url("https://example.com/page?utm_custom=value", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_lowercase_host_keeps_path_case() {
        let result = normalize_url("https://EXAMPLE.COM/Page", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_relative_loc_resolved_against_base() {
        let base = Url::parse("https://example.com/sitemaps/index.xml").unwrap();
        let result = normalize_url("posts.xml", Some(&base)).unwrap();
        assert_eq!(result.as_str(), "https://example.com/sitemaps/posts.xml");

        let result = normalize_url("/page-sitemap.xml", Some(&base)).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page-sitemap.xml");
    }

    #[test]
    fn test_relative_loc_without_base() {
        let result = normalize_url("posts.xml", None);
        assert!(matches!(result, Err(UrlError::Parse(_))));
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/page", None);
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));
    }

    #[test]
    fn test_empty_location() {
        assert!(matches!(normalize_url("   ", None), Err(UrlError::Malformed(_))));
    }
}
