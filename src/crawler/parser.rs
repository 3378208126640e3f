//! Sitemap XML parser
//!
//! This module handles parsing sitemap documents to extract:
//! - Child sitemap locations (from `<sitemap><loc>` in a sitemap index)
//! - Page locations (from `<url><loc>` in a URL set)

use crate::url::normalize_url;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use url::Url;

/// The contents of one sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// A sitemap index listing child sitemap URLs
    Index(Vec<String>),

    /// A URL set listing page URLs (possibly none)
    UrlSet(Vec<String>),
}

impl SitemapDocument {
    /// Number of locations found in the document
    pub fn len(&self) -> usize {
        match self {
            Self::Index(urls) | Self::UrlSet(urls) => urls.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Error raised when a sitemap body is not well-formed XML
#[derive(Debug, Error)]
#[error("Malformed sitemap XML: {0}")]
pub struct SitemapParseError(String);

/// Which `<loc>` parent the reader is currently inside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Sitemap,
    Url,
}

/// Parses a sitemap document
///
/// # Classification
///
/// A document containing at least one `sitemap > loc` element is an index;
/// otherwise it is a URL set made of its `url > loc` elements. A document with
/// neither yields an empty URL set.
///
/// Element names are matched on their local name so namespace-prefixed
/// sitemaps (`<sm:loc>`) parse the same way. Locations are normalized with
/// [`normalize_url`], relative ones resolved against `base`; locations that
/// fail normalization are skipped.
///
/// # Arguments
///
/// * `xml` - The response body
/// * `base` - The URL of the sitemap being parsed
///
/// # Returns
///
/// * `Ok(SitemapDocument)` - The classified locations, in document order
/// * `Err(SitemapParseError)` - The body is not well-formed XML
///
/// # Example
///
/// ```
/// use seo_orchestrator::crawler::{parse_sitemap, SitemapDocument};
/// use url::Url;
///
/// let xml = r#"<urlset><url><loc>https://example.com/</loc></url></urlset>"#;
/// let base = Url::parse("https://example.com/sitemap.xml").unwrap();
/// let doc = parse_sitemap(xml, &base).unwrap();
/// assert_eq!(doc, SitemapDocument::UrlSet(vec!["https://example.com/".to_string()]));
/// ```
pub fn parse_sitemap(xml: &str, base: &Url) -> Result<SitemapDocument, SitemapParseError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut sitemaps = Vec::new();
    let mut pages = Vec::new();

    let mut entry: Option<Entry> = None;
    let mut in_loc = false;
    let mut loc_text = String::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| SitemapParseError(e.to_string()))?;

        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sitemap" => entry = Some(Entry::Sitemap),
                b"url" => entry = Some(Entry::Url),
                b"loc" if entry.is_some() => {
                    in_loc = true;
                    loc_text.clear();
                }
                _ => {}
            },
            Event::Text(e) if in_loc => {
                let text = e.unescape().map_err(|e| SitemapParseError(e.to_string()))?;
                loc_text.push_str(&text);
            }
            Event::CData(e) if in_loc => {
                loc_text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"loc" if in_loc => {
                    in_loc = false;
                    let target = if entry == Some(Entry::Sitemap) {
                        &mut sitemaps
                    } else {
                        &mut pages
                    };
                    match normalize_url(&loc_text, Some(base)) {
                        Ok(url) => target.push(url.to_string()),
                        Err(e) => {
                            tracing::debug!("Skipping location {:?} in {}: {}", loc_text, base, e)
                        }
                    }
                }
                b"sitemap" | b"url" => entry = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if sitemaps.is_empty() {
        Ok(SitemapDocument::UrlSet(pages))
    } else {
        Ok(SitemapDocument::Index(sitemaps))
    }
}
