//! Shaping helpers shared by every provider client.

use scraper::Html;

pub const UNTITLED: &str = "Untitled";
pub const NO_ABSTRACT: &str = "No abstract available";
pub const NO_URL: &str = "#";
pub const UNCATEGORIZED: &str = "uncategorized";

/// Abstract cap for RSS and patent records.
pub const ABSTRACT_CAP: usize = 500;
pub const MAX_INVENTORS: usize = 5;
pub const MAX_ASSIGNEES: usize = 3;

/// Collapse every whitespace run (newlines included) into one space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max` characters, never splitting a UTF-8 sequence.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Plain text content of an HTML fragment.
pub fn html_to_text(html: &str) -> String {
    if !html.contains('<') && !html.contains('&') {
        return html.to_string();
    }
    let fragment = Html::parse_fragment(html);
    fragment.root_element().text().collect::<String>()
}

/// Trimmed value, or `None` when missing or blank.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn or_placeholder(value: Option<&str>, placeholder: &str) -> String {
    non_blank(value).unwrap_or(placeholder).to_string()
}

/// Drop blank names and keep at most `cap` of the rest.
pub fn cap_names<I, S>(names: I, cap: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .filter_map(|n| non_blank(Some(n.as_ref())).map(str::to_string))
        .take(cap)
        .collect()
}
