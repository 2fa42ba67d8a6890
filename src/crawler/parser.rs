//! Category page parser
//!
//! Listing pages show an excerpt for every post followed by a "read more"
//! link to the full judgment. Those links are the only ones the crawler
//! follows.

use crate::url::normalize_url;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracts the post URLs from a category listing page
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` whose visible text contains "read more"
///   (case-insensitive)
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Fragment-only links
/// - Links that are not http(s) after resolution
///
/// Relative links are resolved against `page_url`. Results are normalized
/// and de-duplicated, keeping the order of first appearance.
///
/// # Example
///
/// ```
/// use judgment_harvest::crawler::extract_post_urls;
/// use url::Url;
///
/// let html = r#"<article><a href="/archives/a-vs-b/">Read More</a></article>"#;
/// let page = Url::parse("https://example.com/archives/category/aar/").unwrap();
/// assert_eq!(
///     extract_post_urls(html, &page),
///     vec!["https://example.com/archives/a-vs-b/".to_string()]
/// );
/// ```
pub fn extract_post_urls(html: &str, page_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&a_selector) {
        let text = element.text().collect::<String>();
        if !text.to_lowercase().contains("read more") {
            continue;
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };

        if let Some(url) = resolve_link(href, page_url) {
            if seen.insert(url.clone()) {
                links.push(url);
            }
        }
    }

    tracing::debug!("Found {} post URLs on {}", links.len(), page_url);
    links
}

/// Resolves a link href to a normalized absolute URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    normalize_url(absolute.as_str()).ok().map(|u| u.to_string())
}
