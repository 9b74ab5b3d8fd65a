#![no_main]

use bytes::Bytes;
use chrono::Utc;
use libfuzzer_sys::fuzz_target;
use reqwest::StatusCode;
use url::Url;

use gatherer::extractor::{ExtractOptions, extract_document};
use gatherer::fetcher::types::{Charset, PageResponse};

fuzz_target!(|data: &[u8]| {
    let html = String::from_utf8_lossy(data).to_string();

    let page = PageResponse {
        url_final: Url::parse("https://example.com/article").unwrap(),
        status: StatusCode::OK,
        content_type: "text/html; charset=utf-8".to_string(),
        body_raw: Bytes::from(html.clone()),
        body_utf8: html,
        charset: Charset::Utf8,
        fetched_at: Utc::now(),
    };

    // Rejection is fine, panics are not.
    let _ = extract_document(&page, &ExtractOptions::default());
});
