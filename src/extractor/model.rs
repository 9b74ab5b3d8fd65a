use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

/// Readable body recovered from an article page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub url: Url,
    pub title: String,
    pub site_name: Option<String>,
    pub byline: Option<String>,
    pub excerpt: Option<String>,
    pub language: Option<String>,
    /// Sanitized HTML.
    pub content: String,
    /// Plain text of `content`.
    pub text_content: String,
    pub word_count: usize,
    pub fetched_at: DateTime<Utc>,
}

/// Raw output of the readability pass, before cleaning.
#[derive(Debug)]
pub struct ReadabilityResult {
    pub title: String,
    pub site_name: Option<String>,
    pub byline: Option<String>,
    pub description: Option<String>,
    pub text: String,
    pub html: String,
}

static SPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]*\n\s*\n\s*").unwrap());

/// Collapse runs of spaces and tabs, keep paragraph breaks as a single blank
/// line.
pub fn normalize_whitespace(text: &str) -> String {
    let spaced = SPACE_RUN.replace_all(text.trim(), " ");
    BLANK_LINES.replace_all(&spaced, "\n\n").into_owned()
}

/// Plain text of an HTML fragment, whitespace-normalized. Feed bodies are
/// often entity-escaped markup; this is what their length is measured on.
pub fn text_from_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    normalize_whitespace(&text)
}

/// Up to `max_chars` characters of `text`, cut at a word boundary.
pub fn excerpt_from_text(text: &str, max_chars: usize) -> Option<String> {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.is_empty() {
        return None;
    }
    if flat.chars().count() <= max_chars {
        return Some(flat);
    }

    let mut cut: String = flat.chars().take(max_chars).collect();
    if let Some(pos) = cut.rfind(' ') {
        cut.truncate(pos);
    }
    Some(format!("{}…", cut.trim_end_matches([',', ';', ':', '.'])))
}
