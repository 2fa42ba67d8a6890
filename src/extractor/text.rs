//! Text helpers shared by the field extractors

use scraper::{ElementRef, Node};

/// Collapses every run of whitespace to a single space and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visible text of an element, whitespace-collapsed
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Text of an element split at `<br>` tags
///
/// Empty lines are dropped; each line is whitespace-collapsed.
pub fn element_lines(element: ElementRef<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => current.push_str(text),
            Node::Element(e) if e.name() == "br" => {
                lines.push(std::mem::take(&mut current));
            }
            _ => {}
        }
    }
    lines.push(current);

    lines
        .iter()
        .map(|line| collapse_whitespace(line))
        .filter(|line| !line.is_empty())
        .collect()
}

/// Splits a `Label: value` line
///
/// Labels are short; a colon deep inside a sentence is not a label.
pub fn split_label(line: &str) -> Option<(&str, &str)> {
    let (label, value) = line.split_once(':')?;
    let label = label.trim();
    let value = value.trim();
    if label.is_empty() || value.is_empty() || label.chars().count() > 40 {
        return None;
    }
    Some((label, value))
}

/// Splits a case title of the form `A vs. B` into its two parties
pub fn split_parties(title: &str) -> Option<(String, String)> {
    const SEPARATORS: [&str; 5] = [" vs. ", " vs ", " v/s ", " v. ", " versus "];

    let lower = title.to_ascii_lowercase();
    let (index, separator) = SEPARATORS
        .iter()
        .filter_map(|sep| lower.find(sep).map(|i| (i, *sep)))
        .min_by_key(|(i, _)| *i)?;

    let appellant = title[..index].trim();
    let respondent = title[index + separator.len()..].trim();
    if appellant.is_empty() || respondent.is_empty() {
        return None;
    }
    Some((appellant.to_string(), respondent.to_string()))
}

/// Splits a list of names on commas, `and` and `&`
pub fn split_names(value: &str) -> Vec<String> {
    value
        .split(',')
        .flat_map(|part| part.split(" & "))
        .flat_map(|part| part.split(" and "))
        .map(|name| collapse_whitespace(name.trim_end_matches('.')))
        .filter(|name| !name.is_empty())
        .collect()
}
