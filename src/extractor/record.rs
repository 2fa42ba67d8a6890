//! Fixed-schema extraction record

use serde::Serialize;

/// Column names of an output file, in order
pub const HEADERS: [&str; 23] = [
    "unique_id",
    "category",
    "post_url",
    "title",
    "court",
    "bench",
    "case_number",
    "appellant",
    "respondent",
    "assessment_year",
    "section",
    "decision_date",
    "published_date",
    "judges",
    "counsel",
    "keywords",
    "summary",
    "full_text",
    "pdf_url",
    "comment_count",
    "comments",
    "related_items",
    "source_file",
];

/// Empty value of a multi-valued column
pub const EMPTY_LIST: &str = "[]";

/// One output row
///
/// Every column is a string so a row always has exactly [`HEADERS`] fields.
/// Multi-valued columns (`judges`, `counsel`, `keywords`, `comments`,
/// `related_items`) hold a JSON array and default to `"[]"`; the rest
/// default to the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionRecord {
    pub unique_id: String,
    pub category: String,
    pub post_url: String,
    pub title: String,
    pub court: String,
    pub bench: String,
    pub case_number: String,
    pub appellant: String,
    pub respondent: String,
    pub assessment_year: String,
    pub section: String,
    pub decision_date: String,
    pub published_date: String,
    pub judges: String,
    pub counsel: String,
    pub keywords: String,
    pub summary: String,
    pub full_text: String,
    pub pdf_url: String,
    pub comment_count: String,
    pub comments: String,
    pub related_items: String,
    pub source_file: String,
}

impl Default for ExtractionRecord {
    fn default() -> Self {
        Self {
            unique_id: String::new(),
            category: String::new(),
            post_url: String::new(),
            title: String::new(),
            court: String::new(),
            bench: String::new(),
            case_number: String::new(),
            appellant: String::new(),
            respondent: String::new(),
            assessment_year: String::new(),
            section: String::new(),
            decision_date: String::new(),
            published_date: String::new(),
            judges: EMPTY_LIST.to_string(),
            counsel: EMPTY_LIST.to_string(),
            keywords: EMPTY_LIST.to_string(),
            summary: String::new(),
            full_text: String::new(),
            pdf_url: String::new(),
            comment_count: "0".to_string(),
            comments: EMPTY_LIST.to_string(),
            related_items: EMPTY_LIST.to_string(),
            source_file: String::new(),
        }
    }
}

impl ExtractionRecord {
    /// Field values in [`HEADERS`] order
    pub fn values(&self) -> [&str; 23] {
        [
            self.unique_id.as_str(),
            self.category.as_str(),
            self.post_url.as_str(),
            self.title.as_str(),
            self.court.as_str(),
            self.bench.as_str(),
            self.case_number.as_str(),
            self.appellant.as_str(),
            self.respondent.as_str(),
            self.assessment_year.as_str(),
            self.section.as_str(),
            self.decision_date.as_str(),
            self.published_date.as_str(),
            self.judges.as_str(),
            self.counsel.as_str(),
            self.keywords.as_str(),
            self.summary.as_str(),
            self.full_text.as_str(),
            self.pdf_url.as_str(),
            self.comment_count.as_str(),
            self.comments.as_str(),
            self.related_items.as_str(),
            self.source_file.as_str(),
        ]
    }
}

/// One reader comment on a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub author: String,
    pub date: String,
    pub text: String,
}

/// A "related posts" link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedItem {
    pub title: String,
    pub url: String,
}
