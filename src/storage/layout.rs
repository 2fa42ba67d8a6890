//! On-disk HTML cache layout
//!
//! ```text
//! {data_dir}/
//! └── {category}/
//!     └── page_{n}/
//!         ├── category_response.html   # the listing page itself
//!         └── {unique_id}.html         # one file per post
//! ```
//!
//! The existence of a post file at its expected path is what Phase 1 uses
//! to decide that a post has already been fetched.

use crate::state::Category;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of a saved category listing page
pub const CATEGORY_PAGE_FILE: &str = "category_response.html";

/// Paths into the raw HTML cache
#[derive(Debug, Clone)]
pub struct HtmlCache {
    root: PathBuf,
}

impl HtmlCache {
    /// Creates a cache rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding one listing page and its posts
    pub fn page_dir(&self, category: Category, page: u32) -> PathBuf {
        self.root
            .join(category.slug())
            .join(format!("page_{}", page))
    }

    /// Path of a saved listing page
    pub fn category_page_path(&self, category: Category, page: u32) -> PathBuf {
        self.page_dir(category, page).join(CATEGORY_PAGE_FILE)
    }

    /// Path of a saved post
    pub fn post_path(&self, category: Category, page: u32, unique_id: &str) -> PathBuf {
        self.page_dir(category, page)
            .join(format!("{}.html", unique_id))
    }

    /// Writes `html` to `path`, creating parent directories
    ///
    /// The content goes to a temporary sibling first, so a file at the final
    /// path is always complete.
    pub fn save(&self, path: &Path, html: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("html.part");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(html.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, path)
    }
}

/// Category of a saved post, read from its cache path
///
/// Posts live at `{data_dir}/{category}/page_{n}/{id}.html`, so the category
/// is the name of the directory two levels above the file.
pub fn category_of(post_path: &Path) -> Option<Category> {
    let slug = post_path.parent()?.parent()?.file_name()?.to_str()?;
    Category::from_slug(slug)
}

/// Listing page saved next to a post, if it exists
pub fn sibling_category_page(post_path: &Path) -> Option<PathBuf> {
    let candidate = post_path.parent()?.join(CATEGORY_PAGE_FILE);
    candidate.is_file().then_some(candidate)
}
