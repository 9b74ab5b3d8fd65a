use bytes::Bytes;
use chrono::Utc;
use reqwest::StatusCode;
use url::Url;

use crate::extractor::{ExtractError, ExtractOptions, RejectReason, extract_document};
use crate::fetcher::{Charset, PageResponse};

const ARTICLE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <title>Sample Article Title | News Site</title>
  <meta property="og:site_name" content="News Site">
  <meta name="author" content="Jane Reporter">
  <meta name="description" content="A sample article used to check extraction.">
  <style>body { color: red; }</style>
</head>
<body>
  <nav><a href="/">Home</a> <a href="/world">World</a></nav>
  <article>
    <h1>Sample Article Title</h1>
    <img src="/images/hero.jpg" alt="hero">
    <p>This is the first paragraph of the article. It explains the background of the story in enough detail
    that a reader would understand what happened and why it matters to the people involved.</p>
    <p>This is the second paragraph. It continues the story with additional reporting, quotes from people
    who were present, and a description of what is expected to happen over the next few weeks.</p>
    <p>See the <a href="/related">related coverage</a> and the chart below.</p>
    <img src="/images/sample.jpg" alt="chart">
    <p>A closing paragraph summarises the article and points readers toward further material that explains
    the wider context of the events described above in some more depth.</p>
  </article>
  <script>trackPageView();</script>
</body>
</html>"#;

fn page(html: &str, url: &str) -> PageResponse {
    PageResponse {
        url_final: Url::parse(url).unwrap(),
        status: StatusCode::OK,
        content_type: "text/html; charset=utf-8".to_string(),
        body_raw: Bytes::from(html.to_string()),
        body_utf8: html.to_string(),
        charset: Charset::Utf8,
        fetched_at: Utc::now(),
    }
}

#[test]
fn extracts_article_body() {
    let content = extract_document(&page(ARTICLE, "https://example.com/article"), &ExtractOptions::default())
        .unwrap();

    assert!(content.title.contains("Sample Article"));
    assert_eq!(content.site_name.as_deref(), Some("News Site"));
    assert_eq!(content.byline.as_deref(), Some("Jane Reporter"));
    assert_eq!(
        content.excerpt.as_deref(),
        Some("A sample article used to check extraction.")
    );
    assert!(content.text_content.contains("first paragraph"));
    assert!(content.text_content.contains("second paragraph"));
    assert!(!content.content.contains("<script"));
    assert!(!content.content.contains("<style"));
    assert!(content.content.contains("https://example.com/related"));
    assert!(content.content.contains("https://example.com/images/sample.jpg"));
    assert_eq!(content.language.as_deref(), Some("en"));
    assert!(content.word_count > 60);
}

#[test]
fn removes_featured_image_from_body() {
    let options = ExtractOptions {
        featured_image_url: Some(Url::parse("https://example.com/images/hero.jpg").unwrap()),
    };
    let content = extract_document(&page(ARTICLE, "https://example.com/article"), &options).unwrap();

    assert!(!content.content.contains("hero.jpg"));
    assert!(content.content.contains("sample.jpg"));
}

#[test]
fn empty_page_is_unavailable() {
    let html = r#"<html><head><title>Loading</title></head><body><div id="app"></div></body></html>"#;
    let err = extract_document(&page(html, "https://example.com/empty"), &ExtractOptions::default())
        .unwrap_err();

    assert!(matches!(err, ExtractError::Empty(_)));
    assert!(!err.should_retry());
}

#[test]
fn cookie_wall_is_rejected() {
    let wall = "We use cookie tracking. Accept the privacy policy and terms to continue. ".repeat(8);
    let html = format!(
        "<html><head><title>Consent</title></head><body><article><p>{wall}</p></article></body></html>"
    );
    let err = extract_document(&page(&html, "https://example.com/consent"), &ExtractOptions::default())
        .unwrap_err();

    assert!(matches!(err, ExtractError::Empty(RejectReason::Boilerplate)));
}

#[test]
fn minimal_valid_content() {
    let html = format!(
        r#"<!DOCTYPE html><html><head><title>Valid Article</title></head><body><article><h1>Valid Article</h1><p>{}</p></article></body></html>"#,
        "This is a valid article with enough content to pass the minimum requirements for extraction. ".repeat(20)
    );
    let content = extract_document(&page(&html, "https://example.com/valid"), &ExtractOptions::default())
        .unwrap();

    assert_eq!(content.title, "Valid Article");
    assert!(content.text_content.len() > 250);
}

#[test]
fn malformed_html_does_not_panic() {
    let html = "<html><head><title>Broken</title><body><p>Unclosed tags<div>More content";
    if let Ok(content) = extract_document(&page(html, "https://example.com/broken"), &ExtractOptions::default()) {
        assert_eq!(content.title, "Broken");
    }
}

#[cfg(feature = "fuzz")]
mod fuzz {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn extract_never_panics(
            html in ".*",
            url in "https://[a-z]+\\.com/[a-z]*"
        ) {
            let _ = extract_document(&page(&html, &url), &ExtractOptions::default());
        }

        #[test]
        fn output_has_no_control_characters(html in ".*") {
            if let Ok(content) = extract_document(&page(&html, "https://example.com"), &ExtractOptions::default()) {
                prop_assert!(content.text_content.chars().all(|c| !c.is_control() || c == '\n' || c == '\t'));
            }
        }
    }
}
