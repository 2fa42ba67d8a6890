//! URL handling module for Judgment-Harvest
//!
//! This module provides post URL normalization, content-addressed post ids,
//! and construction of paginated category page URLs.

mod identity;
mod normalize;

use crate::state::Category;

// Re-export main functions
pub use identity::unique_id;
pub use normalize::normalize_url;

/// Builds the URL of one page of a category listing
///
/// Page 1 is the bare category URL; later pages use the `page/<n>/`
/// pagination suffix.
///
/// # Examples
///
/// ```
/// use judgment_harvest::state::Category;
/// use judgment_harvest::url::category_page_url;
///
/// let base = "https://itatonline.org/archives";
/// assert_eq!(
///     category_page_url(base, Category::Aar, 1),
///     "https://itatonline.org/archives/category/aar/"
/// );
/// assert_eq!(
///     category_page_url(base, Category::Aar, 3),
///     "https://itatonline.org/archives/category/aar/page/3/"
/// );
/// ```
pub fn category_page_url(base_url: &str, category: Category, page: u32) -> String {
    let base = base_url.trim_end_matches('/');
    if page <= 1 {
        format!("{}/category/{}/", base, category.slug())
    } else {
        format!("{}/category/{}/page/{}/", base, category.slug(), page)
    }
}
