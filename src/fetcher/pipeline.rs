use crate::fetcher::{
    errors::FetchError,
    types::{Charset, PageResponse},
};
use bytes::Bytes;
use chrono::Utc;
use encoding_rs::Encoding;
use regex::Regex;
use reqwest::StatusCode;
use std::sync::LazyLock;
use url::Url;

/// Bytes inspected for in-document charset declarations.
const SNIFF_LEN: usize = 4096;

static CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static XML_DECL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\s*<\?xml[^>]*?encoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#).unwrap()
});

static META_CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#).unwrap());

static META_HTTP_EQUIV_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\s+[^>]*?http-equiv\s*=\s*["']?content-type["']?[^>]*?content\s*=\s*["']?[^"'>]*?charset\s*=\s*([^"'\s;/>]+)"#).unwrap()
});

pub fn process_response(
    url_final: Url,
    status: StatusCode,
    body_bytes: Bytes,
    content_type: &str,
) -> Result<PageResponse, FetchError> {
    let charset = detect_charset(content_type, &body_bytes);
    let body_utf8 = decode_to_utf8(&body_bytes, &charset)?;

    Ok(PageResponse {
        url_final,
        status,
        content_type: content_type.to_string(),
        body_raw: body_bytes,
        body_utf8,
        charset,
        fetched_at: Utc::now(),
    })
}

/// Header first, then BOM, then in-document declarations (XML prolog for
/// feeds, `<meta>` for pages), then chardetng's guess.
pub(crate) fn detect_charset(content_type: &str, body_bytes: &[u8]) -> Charset {
    if let Some(encoding) = label_from(&CHARSET_REGEX, content_type) {
        return Charset::from_encoding(encoding);
    }

    if let Some((encoding, _)) = Encoding::for_bom(body_bytes) {
        return Charset::from_encoding(encoding);
    }

    let search_bytes = &body_bytes[..body_bytes.len().min(SNIFF_LEN)];
    let search_str = String::from_utf8_lossy(search_bytes);

    for regex in [&*XML_DECL_REGEX, &*META_CHARSET_REGEX, &*META_HTTP_EQUIV_REGEX] {
        if let Some(encoding) = label_from(regex, &search_str) {
            return Charset::from_encoding(encoding);
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(search_bytes, search_bytes.len() == body_bytes.len());
    Charset::from_encoding(detector.guess(None, true))
}

fn label_from(regex: &Regex, haystack: &str) -> Option<&'static Encoding> {
    let label = regex.captures(haystack)?.get(1)?.as_str().to_lowercase();
    Encoding::for_label(label.as_bytes())
}

fn decode_to_utf8(body_bytes: &[u8], charset: &Charset) -> Result<String, FetchError> {
    let encoding = charset.encoding();
    let (decoded, _encoding, had_errors) = encoding.decode(body_bytes);

    if had_errors {
        return Err(FetchError::Charset(format!(
            "failed to decode content as {}",
            encoding.name()
        )));
    }

    Ok(decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_from_content_type() {
        let charset = detect_charset("text/html; charset=utf-8", b"<html></html>");
        assert_eq!(charset, Charset::Utf8);
    }

    #[test]
    fn charset_from_xml_declaration() {
        let body = br#"<?xml version="1.0" encoding="windows-1252"?><rss version="2.0"></rss>"#;
        assert_eq!(detect_charset("application/rss+xml", body), Charset::Windows1252);
    }

    #[test]
    fn charset_from_meta_tag() {
        let body = b"<html><head><meta charset=\"iso-8859-1\"><title>Test</title></head></html>";
        // encoding_rs maps ISO-8859-1 onto its windows-1252 superset.
        assert_eq!(detect_charset("text/html", body), Charset::Windows1252);
    }

    #[test]
    fn charset_from_meta_http_equiv() {
        let body = b"<html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=shift_jis\"></head></html>";
        assert_eq!(detect_charset("text/html", body), Charset::ShiftJis);
    }

    #[test]
    fn decodes_latin1_feed_titles() {
        let mut body = br#"<?xml version="1.0" encoding="iso-8859-1"?><title>Caf"#.to_vec();
        body.push(0xE9);
        body.extend_from_slice(b"</title>");
        let resp = process_response(
            Url::parse("https://example.com/feed").unwrap(),
            StatusCode::OK,
            Bytes::from(body),
            "text/xml",
        )
        .unwrap();
        assert!(resp.body_utf8.contains("Café"));
    }
}
