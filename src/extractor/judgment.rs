//! Field extractor for judgment posts
//!
//! Posts follow a WordPress template: the case title in `h1.entry-title`,
//! the body in `.entry-content`, tags, comments and a related-posts block.
//! Case particulars appear in the body as `Label: value` lines.

use crate::config::SummaryPolicy;
use crate::extractor::record::{Comment, ExtractionRecord, RelatedItem};
use crate::extractor::text::{
    collapse_whitespace, element_lines, element_text, split_label, split_names, split_parties,
};
use crate::extractor::{ExtractError, ExtractionInput, FieldExtractor};
use crate::url::normalize_url;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::fs;
use url::Url;

/// Extractor for the judgment post template
#[derive(Debug, Clone, Default)]
pub struct JudgmentExtractor {
    summary_policy: SummaryPolicy,
}

/// Case particulars found in `Label: value` lines
#[derive(Debug, Default)]
struct Particulars {
    court: String,
    bench: String,
    case_number: String,
    assessment_year: String,
    section: String,
    decision_date: String,
    judges: Vec<String>,
    counsel: Vec<String>,
}

impl Particulars {
    /// Stores `value` under the field `label` names
    ///
    /// Returns false for labels that are not case particulars.
    fn record(&mut self, label: &str, value: &str) -> bool {
        let label = label.to_lowercase();
        let value = value.to_string();

        if label.starts_with("court") {
            set_once(&mut self.court, value);
        } else if label.starts_with("bench") {
            set_once(&mut self.bench, value);
        } else if label.starts_with("assessment year") || label == "a.y." || label == "a.y" {
            set_once(&mut self.assessment_year, value);
        } else if label.starts_with("section") {
            set_once(&mut self.section, value);
        } else if label.contains("date of judgment")
            || label.contains("date of pronouncement")
            || label.contains("date of order")
            || label == "decided on"
        {
            set_once(&mut self.decision_date, value);
        } else if label.contains("appeal no")
            || label.contains("case no")
            || label.contains("ita no")
            || label.contains("petition no")
            || label == "case number"
        {
            set_once(&mut self.case_number, value);
        } else if label.starts_with("judge") || label.starts_with("coram") {
            self.judges.extend(split_names(&value));
        } else if label.starts_with("counsel") || label.starts_with("advocate") {
            self.counsel.push(value);
        } else {
            return false;
        }
        true
    }
}

fn set_once(field: &mut String, value: String) {
    if field.is_empty() {
        *field = value;
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn select_first<'a>(root: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = selector(css)?;
    let found = root.select(&selector).next();
    found
}

fn select_all<'a>(root: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Some(selector) => root.select(&selector).collect(),
        None => Vec::new(),
    }
}

fn to_json<T: Serialize>(field: &'static str, value: &T) -> Result<String, ExtractError> {
    serde_json::to_string(value).map_err(|source| ExtractError::Encode { field, source })
}

impl JudgmentExtractor {
    /// Creates an extractor choosing summaries by `summary_policy`
    pub fn new(summary_policy: SummaryPolicy) -> Self {
        Self { summary_policy }
    }

    /// Extracts a record from already loaded HTML
    ///
    /// `listing_html` is the category page the post was linked from; it
    /// supplies the excerpt and the post date when the post lacks them.
    pub fn extract_html(
        &self,
        input: &ExtractionInput,
        html: &str,
        listing_html: Option<&str>,
    ) -> Result<ExtractionRecord, ExtractError> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let title = select_first(root, "h1.entry-title")
            .map(element_text)
            .filter(|t| !t.is_empty())
            .or_else(|| {
                select_first(root, "title")
                    .map(element_text)
                    .map(|t| t.split(" | ").next().unwrap_or_default().trim().to_string())
                    .filter(|t| !t.is_empty())
            })
            .unwrap_or_default();
        let content = select_first(root, ".entry-content");

        if title.is_empty() && content.is_none() {
            return Err(ExtractError::UnrecognisedTemplate(input.post_path.clone()));
        }

        let mut particulars = Particulars::default();
        let mut detail_summary = String::new();

        if let Some(content) = content {
            for paragraph in select_all(content, "p") {
                let mut is_metadata = false;
                for line in element_lines(paragraph) {
                    if let Some((label, value)) = split_label(&line) {
                        is_metadata |= particulars.record(label, value);
                    }
                }
                if !is_metadata && detail_summary.is_empty() {
                    let text = element_text(paragraph);
                    if !text.is_empty() {
                        detail_summary = text;
                    }
                }
            }
        }

        let listing = listing_html.map(Html::parse_document);
        let listing_article = listing
            .as_ref()
            .and_then(|doc| find_listing_article(doc.root_element(), &input.post_url));
        let listing_summary = listing_article.map(listing_excerpt).unwrap_or_default();

        let published_date = select_first(root, "time.entry-date[datetime]")
            .or_else(|| select_first(root, "time[datetime]"))
            .and_then(|t| t.value().attr("datetime"))
            .map(|d| d.trim().to_string())
            .or_else(|| {
                listing_article
                    .and_then(|a| select_first(a, "time[datetime]"))
                    .and_then(|t| t.value().attr("datetime"))
                    .map(|d| d.trim().to_string())
            })
            .unwrap_or_default();

        let (appellant, respondent) = split_parties(&title).unwrap_or_default();

        let court = if particulars.court.is_empty() {
            input
                .category
                .default_court()
                .map(str::to_string)
                .unwrap_or_default()
        } else {
            particulars.court.clone()
        };

        let comments = extract_comments(root);
        let base = Url::parse(&input.post_url).ok();

        Ok(ExtractionRecord {
            unique_id: input.unique_id.clone(),
            category: input.category.slug().to_string(),
            post_url: input.post_url.clone(),
            title,
            court,
            bench: particulars.bench,
            case_number: particulars.case_number,
            appellant,
            respondent,
            assessment_year: particulars.assessment_year,
            section: particulars.section,
            decision_date: particulars.decision_date,
            published_date,
            judges: to_json("judges", &particulars.judges)?,
            counsel: to_json("counsel", &particulars.counsel)?,
            keywords: to_json("keywords", &extract_keywords(root))?,
            summary: self.choose_summary(detail_summary, listing_summary),
            full_text: content.map(element_text).unwrap_or_default(),
            pdf_url: find_pdf_url(root, base.as_ref()).unwrap_or_default(),
            comment_count: comments.len().to_string(),
            comments: to_json("comments", &comments)?,
            related_items: to_json("related_items", &extract_related(root, base.as_ref()))?,
            source_file: input.post_path.display().to_string(),
        })
    }

    fn choose_summary(&self, detail: String, listing: String) -> String {
        match self.summary_policy {
            SummaryPolicy::Longer => {
                if listing.chars().count() > detail.chars().count() {
                    listing
                } else {
                    detail
                }
            }
            SummaryPolicy::DetailFirst => {
                if detail.is_empty() {
                    listing
                } else {
                    detail
                }
            }
            SummaryPolicy::CategoryFirst => {
                if listing.is_empty() {
                    detail
                } else {
                    listing
                }
            }
        }
    }
}

impl FieldExtractor for JudgmentExtractor {
    fn extract(&self, input: &ExtractionInput) -> Result<ExtractionRecord, ExtractError> {
        let html = fs::read_to_string(&input.post_path).map_err(|source| ExtractError::Io {
            path: input.post_path.clone(),
            source,
        })?;

        let listing_html = input.category_page_path.as_ref().and_then(|path| {
            fs::read_to_string(path)
                .map_err(|e| {
                    tracing::warn!("Could not read category page {}: {}", path.display(), e);
                })
                .ok()
        });

        self.extract_html(input, &html, listing_html.as_deref())
    }
}

/// Article on a listing page that links to `post_url`
fn find_listing_article<'a>(root: ElementRef<'a>, post_url: &str) -> Option<ElementRef<'a>> {
    let target = normalize_url(post_url).ok()?;
    select_all(root, "article").into_iter().find(|article| {
        select_all(*article, "a[href]").iter().any(|a| {
            a.value()
                .attr("href")
                .and_then(|href| target.join(href).ok())
                .and_then(|u| normalize_url(u.as_str()).ok())
                .is_some_and(|u| u == target)
        })
    })
}

/// Excerpt text of a listing article, without its "read more" link
fn listing_excerpt(article: ElementRef<'_>) -> String {
    let body = select_first(article, ".entry-summary")
        .or_else(|| select_first(article, ".entry-content"));
    let paragraphs = match body {
        Some(body) => select_all(body, "p"),
        None => select_all(article, "p"),
    };

    let text = paragraphs
        .into_iter()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    strip_read_more(&text)
}

fn strip_read_more(text: &str) -> String {
    let lower = text.to_lowercase();
    match lower.rfind("read more") {
        // Only strip the trailing link text, not a mention inside the excerpt
        Some(i) if lower.len() == text.len() && lower[i..].chars().count() <= 16 => {
            collapse_whitespace(text[..i].trim_end_matches(['…', '.', ' ', '[', '(']))
        }
        _ => text.to_string(),
    }
}

fn extract_keywords(root: ElementRef<'_>) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for tag in select_all(root, ".tags-links a, a[rel~=\"tag\"]") {
        let text = element_text(tag);
        if !text.is_empty() && !keywords.contains(&text) {
            keywords.push(text);
        }
    }
    keywords
}

fn find_pdf_url(root: ElementRef<'_>, base: Option<&Url>) -> Option<String> {
    select_all(root, "a[href]").into_iter().find_map(|a| {
        let href = a.value().attr("href")?.trim();
        let path = href.split(['?', '#']).next().unwrap_or_default();
        if !path.to_ascii_lowercase().ends_with(".pdf") {
            return None;
        }
        Some(resolve(href, base))
    })
}

fn resolve(href: &str, base: Option<&Url>) -> String {
    base.and_then(|b| b.join(href).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| href.to_string())
}

fn extract_comments(root: ElementRef<'_>) -> Vec<Comment> {
    select_all(root, "ol.comment-list li.comment, .commentlist li.comment")
        .into_iter()
        .map(|comment| {
            let author = select_first(comment, ".comment-author .fn")
                .or_else(|| select_first(comment, ".fn"))
                .map(element_text)
                .unwrap_or_default();
            let date = select_first(comment, "time[datetime]")
                .and_then(|t| t.value().attr("datetime").map(str::to_string))
                .or_else(|| select_first(comment, ".comment-metadata a").map(element_text))
                .unwrap_or_default();
            let text = select_first(comment, ".comment-content")
                .map(element_text)
                .unwrap_or_default();
            Comment { author, date, text }
        })
        .collect()
}

fn extract_related(root: ElementRef<'_>, base: Option<&Url>) -> Vec<RelatedItem> {
    let mut items: Vec<RelatedItem> = Vec::new();
    for link in select_all(
        root,
        ".jp-relatedposts-post a[href], .related-posts a[href], .yarpp-related a[href]",
    ) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let url = resolve(href.trim(), base);
        let title = Some(element_text(link))
            .filter(|t| !t.is_empty())
            .or_else(|| link.value().attr("title").map(collapse_whitespace))
            .unwrap_or_default();
        if title.is_empty() || items.iter().any(|i| i.url == url) {
            continue;
        }
        items.push(RelatedItem { title, url });
    }
    items
}
