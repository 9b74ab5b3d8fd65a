use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

const FEED_BASE: &str = "https://www.youtube.com/feeds/videos.xml";

static CHANNEL_ID_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(?:channelId|externalId)"\s*:\s*"(UC[\w-]{22})""#).unwrap());
static VANITY_URL_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""vanityChannelUrl"\s*:\s*"(https?://(?:www\.)?youtube\.com/@[^"]+)""#).unwrap()
});
static CANONICAL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("link[rel='canonical']").unwrap());
static CHANNEL_ID_META: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("meta[itemprop='channelId'], meta[itemprop='identifier']").unwrap()
});
static OG_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("meta[property='og:title']").unwrap());

/// `https://www.youtube.com/feeds/videos.xml?channel_id=<id>`.
pub fn channel_feed_url(channel_id: &str) -> Option<Url> {
    if !channel_id.starts_with("UC") {
        return None;
    }
    Url::parse_with_params(FEED_BASE, &[("channel_id", channel_id)]).ok()
}

/// What a channel page says about itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPage {
    pub channel_id: String,
    /// `@handle` URL when the channel has one, else the `/channel/` URL.
    pub canonical_url: Url,
    pub title: Option<String>,
}

pub fn parse_channel_page(html: &str) -> Option<ChannelPage> {
    let document = Html::parse_document(html);

    let canonical = document
        .select(&CANONICAL)
        .filter_map(|el| el.value().attr("href"))
        .find_map(|href| Url::parse(href).ok());

    let channel_id = document
        .select(&CHANNEL_ID_META)
        .filter_map(|el| el.value().attr("content"))
        .find(|id| id.starts_with("UC"))
        .map(str::to_string)
        .or_else(|| {
            canonical
                .as_ref()
                .and_then(|c| c.path().strip_prefix("/channel/"))
                .filter(|id| id.starts_with("UC"))
                .map(str::to_string)
        })
        .or_else(|| CHANNEL_ID_JSON.captures(html).map(|c| c[1].to_string()))?;

    let vanity = VANITY_URL_JSON
        .captures(html)
        .and_then(|c| Url::parse(&c[1]).ok())
        .map(|mut url| {
            let _ = url.set_scheme("https");
            url
        });

    let canonical_url = vanity
        .or(canonical)
        .or_else(|| Url::parse(&format!("https://www.youtube.com/channel/{channel_id}")).ok())?;

    let title = document
        .select(&OG_TITLE)
        .filter_map(|el| el.value().attr("content"))
        .map(|t| t.trim().to_string())
        .find(|t| !t.is_empty());

    Some(ChannelPage {
        channel_id,
        canonical_url,
        title,
    })
}

/// The `@handle` or `/c/name` segment a URL names, lowercased.
fn named_handle(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let first = segments.next()?;
    let name = if first.starts_with('@') {
        first.trim_start_matches('@')
    } else if matches!(first, "c" | "user") {
        segments.next()?
    } else {
        return None;
    };
    Some(name.to_ascii_lowercase())
}

/// True when the channel a page describes is not the one the user typed.
pub fn is_redirect(typed: &Url, page: &ChannelPage) -> bool {
    // A page that only knows its channel id gives nothing to compare.
    matches!(
        (named_handle(typed), named_handle(&page.canonical_url)),
        (Some(typed), Some(canonical)) if typed != canonical
    )
}
