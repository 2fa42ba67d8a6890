/// Category definitions for the sections of the source site
///
/// Each category is paginated independently and maps to a URL slug.
use crate::HarvestError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A top-level content section of the source site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Authority for Advance Rulings
    Aar,
    AllJudgements,
    HighCourt,
    Others,
    SupremeCourt,
    Tribunal,
}

impl Category {
    /// Every category, in the order the site lists them
    pub const ALL: [Category; 6] = [
        Self::Aar,
        Self::AllJudgements,
        Self::HighCourt,
        Self::Others,
        Self::SupremeCourt,
        Self::Tribunal,
    ];

    /// Returns the URL slug (also used for directory names and CSV cells)
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Aar => "aar",
            Self::AllJudgements => "all-judgements",
            Self::HighCourt => "high-court",
            Self::Others => "others",
            Self::SupremeCourt => "supreme-court",
            Self::Tribunal => "tribunal",
        }
    }

    /// Parses a slug back into a category
    pub fn from_slug(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.slug() == s)
    }

    /// Court name implied by the category, used when a post names none
    pub fn default_court(&self) -> Option<&'static str> {
        match self {
            Self::Aar => Some("Authority for Advance Rulings"),
            Self::HighCourt => Some("High Court"),
            Self::SupremeCourt => Some("Supreme Court"),
            Self::Tribunal => Some("ITAT"),
            Self::AllJudgements | Self::Others => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Category {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slug(s.trim()).ok_or_else(|| HarvestError::UnknownCategory(s.to_string()))
    }
}
