use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Charset {
    Utf8,
    Windows1252,
    ShiftJis,
    Gbk,
    Big5,
    Other(String),
}

impl Charset {
    pub fn from_encoding(encoding: &'static encoding_rs::Encoding) -> Self {
        use std::ptr;

        if ptr::eq(encoding, encoding_rs::UTF_8) {
            Self::Utf8
        } else if ptr::eq(encoding, encoding_rs::WINDOWS_1252) {
            Self::Windows1252
        } else if ptr::eq(encoding, encoding_rs::SHIFT_JIS) {
            Self::ShiftJis
        } else if ptr::eq(encoding, encoding_rs::GBK) || ptr::eq(encoding, encoding_rs::GB18030) {
            Self::Gbk
        } else if ptr::eq(encoding, encoding_rs::BIG5) {
            Self::Big5
        } else {
            Self::Other(encoding.name().to_string())
        }
    }

    pub fn encoding(&self) -> &'static encoding_rs::Encoding {
        match self {
            Self::Utf8 => encoding_rs::UTF_8,
            Self::Windows1252 => encoding_rs::WINDOWS_1252,
            Self::ShiftJis => encoding_rs::SHIFT_JIS,
            Self::Gbk => encoding_rs::GBK,
            Self::Big5 => encoding_rs::BIG5,
            Self::Other(name) => {
                encoding_rs::Encoding::for_label(name.as_bytes()).unwrap_or(encoding_rs::UTF_8)
            }
        }
    }
}

/// What the caller is willing to accept from a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    /// HTML pages for extraction.
    Html,
    /// Syndication documents (XML or JSON Feed). Servers label these
    /// inconsistently, so `text/html` and `text/plain` are accepted too and
    /// the parser decides.
    Feed,
    /// Classification probe: anything textual.
    Any,
}

impl ContentClass {
    pub fn accept_header(self) -> &'static str {
        match self {
            Self::Html => "text/html,application/xhtml+xml;q=0.9,*/*;q=0.5",
            Self::Feed => {
                "application/rss+xml,application/atom+xml,application/feed+json,application/xml;q=0.9,text/xml;q=0.9,*/*;q=0.5"
            }
            Self::Any => "*/*",
        }
    }

    pub fn allows(self, content_type: &str) -> bool {
        let ct = content_type.to_ascii_lowercase();
        match self {
            Self::Html => ct.contains("text/html") || ct.contains("application/xhtml"),
            Self::Feed => {
                ct.contains("xml")
                    || ct.contains("json")
                    || ct.contains("text/html")
                    || ct.contains("text/plain")
                    || ct.contains("application/octet-stream")
            }
            Self::Any => !(ct.starts_with("image/") || ct.starts_with("audio/") || ct.starts_with("video/")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageResponse {
    pub url_final: Url,
    pub status: StatusCode,
    pub content_type: String,
    pub body_raw: Bytes,
    pub body_utf8: String,
    pub charset: Charset,
    pub fetched_at: DateTime<Utc>,
}

impl PageResponse {
    /// True when the final URL differs from `requested` after redirects.
    pub fn was_redirected(&self, requested: &Url) -> bool {
        self.url_final != *requested
    }
}
