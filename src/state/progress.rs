//! Per-category crawl cursor
//!
//! `ProgressState` holds the last fully processed page of every category.
//! It is the in-memory form of the progress file and is always replaced as
//! a whole by the store.

use crate::state::Category;
use std::collections::BTreeMap;

/// Last fully processed page, keyed by category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
    pages: BTreeMap<Category, u32>,
}

/// What happened when a page was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The cursor moved forward (or was set for the first time)
    Moved { from: Option<u32>, to: u32 },
    /// The cursor already pointed at this page
    Unchanged,
    /// The page is behind the cursor and was not recorded
    Rejected { current: u32, requested: u32 },
}

impl ProgressState {
    /// Creates an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last completed page of a category
    pub fn last_page(&self, category: Category) -> Option<u32> {
        self.pages.get(&category).copied()
    }

    /// Page the next crawl of `category` starts from
    ///
    /// The recorded page is visited again: it was fully handled, so
    /// repeating it only re-reads saved posts.
    pub fn resume_page(&self, category: Category) -> u32 {
        self.last_page(category).unwrap_or(1).max(1)
    }

    /// Records `page` as completed for `category`
    ///
    /// The cursor never moves backwards.
    pub fn advance(&mut self, category: Category, page: u32) -> Advance {
        match self.pages.get(&category).copied() {
            Some(current) if current == page => Advance::Unchanged,
            Some(current) if current > page => Advance::Rejected {
                current,
                requested: page,
            },
            from => {
                self.pages.insert(category, page);
                Advance::Moved { from, to: page }
            }
        }
    }

    /// Iterates categories in slug order with their last page
    pub fn iter(&self) -> impl Iterator<Item = (Category, u32)> + '_ {
        self.pages.iter().map(|(c, p)| (*c, *p))
    }

    /// Number of categories with a recorded page
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns true if no category has a recorded page
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl FromIterator<(Category, u32)> for ProgressState {
    fn from_iter<I: IntoIterator<Item = (Category, u32)>>(iter: I) -> Self {
        let mut state = Self::new();
        for (category, page) in iter {
            state.advance(category, page);
        }
        state
    }
}
