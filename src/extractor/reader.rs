use readability::extractor;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

use crate::extractor::model::ReadabilityResult;

/// Candidate containers for the scraper fallback, most specific first.
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "[itemprop='articleBody']",
    ".entry-content",
    ".post-content",
    ".article-body",
    "main",
    "[role='main']",
    "#content",
    ".content",
    ".post",
];

/// Subtrees never counted as article text in the fallback.
const BOILERPLATE_SELECTOR: &str =
    "script, style, noscript, nav, header, footer, aside, form, iframe, .ad, .ads, .advert, .share, .social, .comments, #comments";

/// Minimum text characters for a fallback candidate to win.
const MIN_CANDIDATE_CHARS: usize = 140;

static BYLINE_SELECTORS: LazyLock<Vec<(Selector, Option<&'static str>)>> = LazyLock::new(|| {
    [
        ("meta[name='author']", Some("content")),
        ("meta[property='article:author']", Some("content")),
        ("[rel='author']", None),
        ("[itemprop='author']", None),
        (".byline", None),
        (".author", None),
    ]
    .into_iter()
    .filter_map(|(css, attr)| Selector::parse(css).ok().map(|s| (s, attr)))
    .collect()
});

pub fn extract(html: &str, url: &Url) -> Option<ReadabilityResult> {
    let document = Html::parse_document(html);

    if let Ok(article) = extractor::extract(&mut html.as_bytes(), url)
        && !article.text.trim().is_empty()
    {
        let title = if article.title.trim().is_empty() {
            extract_title(&document).unwrap_or_default()
        } else {
            article.title
        };
        return Some(ReadabilityResult {
            title,
            site_name: extract_site_name(&document),
            byline: extract_byline(&document),
            description: extract_description(&document),
            text: article.text,
            html: article.content,
        });
    }

    fallback_extract(&document)
}

fn first_meta(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .find(|c| !c.is_empty())
}

fn extract_site_name(document: &Html) -> Option<String> {
    if let Some(name) = first_meta(document, "meta[property='og:site_name']") {
        return Some(name);
    }

    // "Article Title - Site Name" or "Article Title | Site Name"
    let title = document_title(document)?;
    for sep in [" | ", " - ", " — "] {
        if let Some(pos) = title.rfind(sep) {
            let name = title[pos + sep.len()..].trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

fn extract_byline(document: &Html) -> Option<String> {
    for (selector, attr) in BYLINE_SELECTORS.iter() {
        for element in document.select(selector) {
            let value = match attr {
                Some(attr) => element.value().attr(attr).map(str::to_string),
                None => Some(collapsed_text(&element)),
            };
            if let Some(value) = value {
                let value = value.trim().trim_start_matches("By ").trim_start_matches("by ");
                if !value.is_empty() && value.len() < 120 {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

fn extract_description(document: &Html) -> Option<String> {
    first_meta(document, "meta[name='description']")
        .or_else(|| first_meta(document, "meta[property='og:description']"))
}

fn document_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let title = collapsed_text(&document.select(&selector).next()?);
    (!title.is_empty()).then_some(title)
}

fn extract_title(document: &Html) -> Option<String> {
    if let Some(title) = first_meta(document, "meta[property='og:title']") {
        return Some(title);
    }
    if let Some(title) = document_title(document) {
        return Some(title);
    }
    let selector = Selector::parse("h1").ok()?;
    document
        .select(&selector)
        .map(|el| collapsed_text(&el))
        .find(|t| !t.is_empty())
}

fn collapsed_text(element: &ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of `element` minus boilerplate descendants.
fn content_text(element: &ElementRef, boilerplate: &Selector) -> String {
    let excluded: Vec<_> = element.select(boilerplate).map(|e| e.id()).collect();
    let mut text = String::new();
    for node in element.descendants() {
        if let Some(t) = node.value().as_text()
            && !node.ancestors().any(|a| excluded.contains(&a.id()))
        {
            text.push_str(t);
        }
    }
    text
}

fn fallback_extract(document: &Html) -> Option<ReadabilityResult> {
    let title = extract_title(document)?;
    let boilerplate = Selector::parse(BOILERPLATE_SELECTOR).ok()?;

    // Highest text density wins among the known containers; body is the
    // last resort.
    let mut best: Option<(usize, String, String)> = None;
    for css in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        for element in document.select(&selector) {
            let text = content_text(&element, &boilerplate);
            let len = text.split_whitespace().map(str::len).sum::<usize>();
            if len >= MIN_CANDIDATE_CHARS && best.as_ref().is_none_or(|(b, _, _)| len > *b) {
                best = Some((len, text, element.html()));
            }
        }
    }

    let (text, html) = match best {
        Some((_, text, html)) => (text, html),
        None => {
            let body_selector = Selector::parse("body").ok()?;
            let body = document.select(&body_selector).next()?;
            (content_text(&body, &boilerplate), body.html())
        }
    };

    if text.trim().is_empty() {
        return None;
    }

    Some(ReadabilityResult {
        title,
        site_name: extract_site_name(document),
        byline: extract_byline(document),
        description: extract_description(document),
        text,
        html,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_prefers_densest_container_and_skips_nav() {
        let body = "Real article text that goes on for a while. ".repeat(10);
        let html = format!(
            r#"<html><head><title>Post - Blog</title><meta name="author" content="Ada Lovelace"></head>
            <body><nav>Home About Contact Subscribe Login</nav>
            <div class="content"><p>short teaser</p></div>
            <article><nav>Skip me</nav><p>{body}</p></article></body></html>"#
        );
        let document = Html::parse_document(&html);
        let result = fallback_extract(&document).unwrap();

        assert!(result.text.contains("Real article text"));
        assert!(!result.text.contains("Skip me"));
        assert_eq!(result.byline.as_deref(), Some("Ada Lovelace"));
        assert_eq!(result.site_name.as_deref(), Some("Blog"));
    }

    #[test]
    fn byline_from_visible_markup() {
        let document = Html::parse_document(
            r#"<html><body><p class="byline">By Grace Hopper</p></body></html>"#,
        );
        assert_eq!(extract_byline(&document).as_deref(), Some("Grace Hopper"));
    }
}
