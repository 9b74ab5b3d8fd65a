//! Source type inference from raw URLs.
//!
//! [`classify`] never touches the network. [`classify_with_probe`] adds the
//! lookups that need it: YouTube channel resolution, Apple Podcasts feed
//! lookup, and content sniffing for URLs no pattern recognises.

pub mod patterns;
pub mod youtube;

pub use patterns::social_handle;

use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::entities::SourceKind;
use crate::fetcher::{HttpClient, PageResponse};

const ITUNES_LOOKUP: &str = "https://itunes.apple.com/lookup";
/// Bytes inspected for a feed root element.
const SNIFF_WINDOW: usize = 1024;

static FEED_ROOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(rss|feed|rdf:RDF)[\s>]").unwrap());
static ALTERNATE_FEED: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "link[rel='alternate'][type='application/rss+xml'], link[rel='alternate'][type='application/atom+xml'], link[rel='alternate'][type='application/feed+json']",
    )
    .unwrap()
});
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static APPLE_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/id(\d+)").unwrap());

/// The channel the platform resolved to differs from the one typed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Redirect {
    pub from: Url,
    pub to: Url,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    /// `None` only for input that is not an absolute http(s) URL.
    pub kind: Option<SourceKind>,
    pub suggested_title: String,
    pub suggested_feed_url: Option<Url>,
    pub redirect: Option<Redirect>,
}

impl Classification {
    pub(crate) fn detected(kind: SourceKind, title: String) -> Self {
        Self {
            kind: Some(kind),
            suggested_title: title,
            suggested_feed_url: None,
            redirect: None,
        }
    }

    pub(crate) fn with_feed(mut self, feed_url: Url) -> Self {
        self.suggested_feed_url = Some(feed_url);
        self
    }

    pub fn not_detected() -> Self {
        Self {
            kind: None,
            suggested_title: String::new(),
            suggested_feed_url: None,
            redirect: None,
        }
    }

    pub fn is_detected(&self) -> bool {
        self.kind.is_some()
    }

    fn website(url: &Url) -> Self {
        let title = patterns::bare_host(url).unwrap_or_default();
        Self::detected(SourceKind::Website, title)
    }
}

fn parse_input(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    (matches!(url.scheme(), "http" | "https") && url.host_str().is_some()).then_some(url)
}

/// Pattern-only classification. Unrecognised URLs are websites.
pub fn classify(raw: &str) -> Classification {
    let Some(url) = parse_input(raw) else {
        return Classification::not_detected();
    };
    patterns::match_url(&url).unwrap_or_else(|| Classification::website(&url))
}

/// Pattern classification plus whatever network lookups the result needs.
/// Lookup failures degrade to the pattern result; they never fail the call.
#[instrument(skip(client))]
pub async fn classify_with_probe(client: &HttpClient, raw: &str) -> Classification {
    let Some(url) = parse_input(raw) else {
        return Classification::not_detected();
    };

    let Some(classification) = patterns::match_url(&url) else {
        return probe(client, &url).await;
    };

    match classification.kind {
        Some(SourceKind::YoutubeChannel) if classification.suggested_feed_url.is_none() => {
            resolve_youtube_channel(client, &url, classification).await
        }
        Some(SourceKind::Podcast) if classification.suggested_feed_url.is_none() => {
            resolve_podcast_feed(client, &url, classification).await
        }
        _ => classification,
    }
}

async fn resolve_youtube_channel(
    client: &HttpClient,
    url: &Url,
    mut classification: Classification,
) -> Classification {
    let page = match client.fetch_page(url.as_str()).await {
        Ok(page) => page,
        Err(err) => {
            warn!(error = %err, "channel page unavailable, feed left unresolved");
            return classification;
        }
    };

    let Some(channel) = youtube::parse_channel_page(&page.body_utf8) else {
        warn!("channel page carried no channel id");
        return classification;
    };

    classification.suggested_feed_url = youtube::channel_feed_url(&channel.channel_id);
    if let Some(title) = channel.title.clone() {
        classification.suggested_title = title;
    }
    if youtube::is_redirect(url, &channel) || youtube::is_redirect(url, &handle_page(&page, &channel)) {
        debug!(to = %channel.canonical_url, "channel handle resolved elsewhere");
        classification.redirect = Some(Redirect {
            from: url.clone(),
            to: channel.canonical_url,
        });
    }
    classification
}

/// The channel as seen through the final URL of the HTTP exchange, which
/// differs from the typed one when YouTube redirected the handle.
fn handle_page(page: &PageResponse, channel: &youtube::ChannelPage) -> youtube::ChannelPage {
    youtube::ChannelPage {
        canonical_url: page.url_final.clone(),
        ..channel.clone()
    }
}

#[derive(Deserialize)]
struct ItunesLookup {
    #[serde(default)]
    results: Vec<ItunesResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItunesResult {
    feed_url: Option<String>,
    collection_name: Option<String>,
}

pub(crate) fn apple_podcast_id(url: &Url) -> Option<String> {
    if patterns::bare_host(url).as_deref() != Some("podcasts.apple.com") {
        return None;
    }
    APPLE_ID.captures(url.path()).map(|c| c[1].to_string())
}

pub(crate) fn parse_itunes_lookup(body: &str) -> Option<(Url, Option<String>)> {
    let lookup: ItunesLookup = serde_json::from_str(body).ok()?;
    lookup.results.into_iter().find_map(|r| {
        let feed = Url::parse(r.feed_url.as_deref()?).ok()?;
        Some((feed, r.collection_name))
    })
}

async fn resolve_podcast_feed(
    client: &HttpClient,
    url: &Url,
    mut classification: Classification,
) -> Classification {
    if let Some(id) = apple_podcast_id(url) {
        let Ok(lookup_url) = Url::parse_with_params(ITUNES_LOOKUP, &[("id", id.as_str()), ("entity", "podcast")])
        else {
            return classification;
        };
        match client.probe(lookup_url.as_str()).await {
            Ok(response) => {
                if let Some((feed, name)) = parse_itunes_lookup(&response.body_utf8) {
                    classification.suggested_feed_url = Some(feed);
                    if let Some(name) = name {
                        classification.suggested_title = name;
                    }
                }
            }
            Err(err) => warn!(error = %err, "podcast directory lookup failed"),
        }
        return classification;
    }

    // Hosting pages usually advertise their RSS feed.
    match client.probe(url.as_str()).await {
        Ok(page) => {
            if let Sniffed::Html { feed_url, .. } = sniff(&page) {
                classification.suggested_feed_url = feed_url;
            }
        }
        Err(err) => warn!(error = %err, "podcast page probe failed"),
    }
    classification
}

/// What a probed response turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Sniffed {
    Feed,
    Html {
        feed_url: Option<Url>,
        title: Option<String>,
    },
    Other,
}

pub fn sniff(page: &PageResponse) -> Sniffed {
    let ct = page.content_type.to_ascii_lowercase();
    let head: String = page.body_utf8.chars().take(SNIFF_WINDOW).collect();

    let feed_type = ct.contains("rss")
        || ct.contains("atom")
        || ct.contains("application/feed+json")
        || ((ct.contains("/xml") || ct.contains("+xml")) && !ct.contains("xhtml"));
    if feed_type || FEED_ROOT.is_match(&head) || head.contains("https://jsonfeed.org/version") {
        return Sniffed::Feed;
    }

    if !(ct.contains("html") || head.to_ascii_lowercase().contains("<html")) {
        return Sniffed::Other;
    }

    let document = Html::parse_document(&page.body_utf8);
    let feed_url = document
        .select(&ALTERNATE_FEED)
        .filter_map(|el| el.value().attr("href"))
        .find_map(|href| page.url_final.join(href).ok());
    let title = document
        .select(&TITLE)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    Sniffed::Html { feed_url, title }
}

async fn probe(client: &HttpClient, url: &Url) -> Classification {
    let response = match client.probe(url.as_str()).await {
        Ok(response) => response,
        Err(err) => {
            debug!(error = %err, "probe failed, defaulting to website");
            return Classification::website(url);
        }
    };

    match sniff(&response) {
        Sniffed::Feed => {
            let mut c = Classification::website(url).with_feed(response.url_final.clone());
            c.kind = Some(SourceKind::Feed);
            c
        }
        Sniffed::Html { feed_url, title } => {
            let mut c = Classification::website(url);
            c.suggested_feed_url = feed_url;
            if let Some(title) = title {
                c.suggested_title = title;
            }
            c
        }
        Sniffed::Other => Classification::website(url),
    }
}
