use crate::url::normalize_url;
use sha2::{Digest, Sha256};

/// Derives the content-addressed id of a post from its URL
///
/// The URL is normalized first, so cosmetic differences (fragments,
/// tracking parameters, host case) map to the same id. Unparseable input is
/// hashed verbatim after trimming, keeping the function total.
///
/// # Examples
///
/// ```
/// use judgment_harvest::url::unique_id;
///
/// let a = unique_id("https://example.com/archives/x-vs-y/");
/// let b = unique_id("https://EXAMPLE.com/archives/x-vs-y/#respond");
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
/// ```
pub fn unique_id(url: &str) -> String {
    let canonical = match normalize_url(url) {
        Ok(normalized) => normalized.to_string(),
        Err(_) => url.trim().to_string(),
    };

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}
