//! Network-free URL pattern matching, in precedence order.

use url::Url;

use super::Classification;
use crate::entities::SourceKind;

const PODCAST_HOSTS: &[&str] = &[
    "podcasts.apple.com",
    "anchor.fm",
    "buzzsprout.com",
    "libsyn.com",
    "podbean.com",
    "simplecast.com",
    "transistor.fm",
    "megaphone.fm",
    "captivate.fm",
];

const FEED_PATH_SUFFIXES: &[&str] = &["/feed", "/rss", "/atom", ".xml", ".rss", ".atom"];

/// First path segments on twitter.com/x.com that are not accounts.
const TWITTER_RESERVED: &[&str] = &[
    "home", "i", "search", "explore", "notifications", "messages", "settings", "intent", "share",
    "hashtag", "login", "signup", "tos", "privacy",
];

const INSTAGRAM_RESERVED: &[&str] = &["p", "reel", "reels", "explore", "stories", "accounts", "direct"];

/// Host without a leading `www.` or `m.`, lowercased.
pub(crate) fn bare_host(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .or_else(|| host.strip_prefix("mobile."))
        .unwrap_or(&host);
    Some(host.to_string())
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

fn segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default()
}

/// Classification from patterns alone; `None` when nothing matched and a
/// probe is needed.
pub fn match_url(url: &Url) -> Option<Classification> {
    let host = bare_host(url)?;

    match_platform(url, &host)
        .or_else(|| match_podcast(url, &host))
        .or_else(|| match_feed_path(url, &host))
}

fn match_platform(url: &Url, host: &str) -> Option<Classification> {
    let segs = segments(url);

    if host == "youtu.be" {
        let id = segs.first()?;
        return Some(Classification::detected(SourceKind::YoutubeVideo, format!("YouTube video {id}")));
    }

    if host_matches(host, "youtube.com") {
        return match_youtube(url, &segs);
    }

    if host == "twitter.com" || host == "x.com" {
        let handle = segs.first().filter(|h| !TWITTER_RESERVED.contains(&h.to_ascii_lowercase().as_str()))?;
        return Some(Classification::detected(SourceKind::Twitter, format!("@{handle}")));
    }

    if host == "instagram.com" {
        let handle = segs.first().filter(|h| !INSTAGRAM_RESERVED.contains(*h))?;
        return Some(Classification::detected(SourceKind::Instagram, format!("@{handle}")));
    }

    if host == "tiktok.com" {
        let handle = segs.first().and_then(|s| s.strip_prefix('@'))?;
        return Some(Classification::detected(SourceKind::Tiktok, format!("@{handle}")));
    }

    None
}

fn match_youtube(url: &Url, segs: &[&str]) -> Option<Classification> {
    match segs {
        ["watch"] => {
            let (_, id) = url.query_pairs().find(|(k, _)| k == "v")?;
            Some(Classification::detected(SourceKind::YoutubeVideo, format!("YouTube video {id}")))
        }
        ["shorts" | "live" | "embed", id, ..] => Some(Classification::detected(
            SourceKind::YoutubeVideo,
            format!("YouTube video {id}"),
        )),
        ["feeds", "videos.xml"] => {
            let (_, id) = url.query_pairs().find(|(k, _)| k == "channel_id")?;
            Some(
                Classification::detected(SourceKind::YoutubeChannel, id.to_string())
                    .with_feed(url.clone()),
            )
        }
        ["channel", id, ..] if id.starts_with("UC") => Some(
            Classification::detected(SourceKind::YoutubeChannel, (*id).to_string())
                .with_feed(super::youtube::channel_feed_url(id)?),
        ),
        [handle, ..] if handle.starts_with('@') => Some(Classification::detected(
            SourceKind::YoutubeChannel,
            (*handle).to_string(),
        )),
        ["c" | "user", name, ..] => Some(Classification::detected(
            SourceKind::YoutubeChannel,
            (*name).to_string(),
        )),
        _ => None,
    }
}

fn match_podcast(url: &Url, host: &str) -> Option<Classification> {
    let spotify_show = host == "open.spotify.com" && segments(url).first() == Some(&"show");
    if !spotify_show && !PODCAST_HOSTS.iter().any(|d| host_matches(host, d)) {
        return None;
    }

    let classification = Classification::detected(SourceKind::Podcast, host.to_string());
    Some(if looks_like_feed_path(url) {
        classification.with_feed(url.clone())
    } else {
        classification
    })
}

fn match_feed_path(url: &Url, host: &str) -> Option<Classification> {
    looks_like_feed_path(url)
        .then(|| Classification::detected(SourceKind::Feed, host.to_string()).with_feed(url.clone()))
}

pub(crate) fn looks_like_feed_path(url: &Url) -> bool {
    let path = url.path().trim_end_matches('/').to_ascii_lowercase();
    FEED_PATH_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
        || path.contains("/feed/")
        || path.contains("/rss/")
}

/// Account handle of a social source URL, without the `@`.
pub fn social_handle(kind: SourceKind, url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let classification = match_platform(&url, &bare_host(&url)?)?;
    if classification.kind != Some(kind) || !kind.is_social() {
        return None;
    }
    classification
        .suggested_title
        .strip_prefix('@')
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(url: &str) -> Option<SourceKind> {
        match_url(&Url::parse(url).unwrap()).and_then(|c| c.kind)
    }

    #[test]
    fn youtube_variants() {
        assert_eq!(kind_of("https://www.youtube.com/@rustlang"), Some(SourceKind::YoutubeChannel));
        assert_eq!(kind_of("https://youtube.com/c/Rust"), Some(SourceKind::YoutubeChannel));
        assert_eq!(kind_of("https://m.youtube.com/watch?v=abc123"), Some(SourceKind::YoutubeVideo));
        assert_eq!(kind_of("https://youtu.be/abc123"), Some(SourceKind::YoutubeVideo));
        assert_eq!(kind_of("https://www.youtube.com/shorts/xyz"), Some(SourceKind::YoutubeVideo));
    }

    #[test]
    fn channel_id_urls_resolve_feed_offline() {
        let c = match_url(&Url::parse("https://www.youtube.com/channel/UCaYhcUwRBNscFNUKTjgPFiA").unwrap())
            .unwrap();
        assert_eq!(c.kind, Some(SourceKind::YoutubeChannel));
        assert_eq!(
            c.suggested_feed_url.unwrap().as_str(),
            "https://www.youtube.com/feeds/videos.xml?channel_id=UCaYhcUwRBNscFNUKTjgPFiA"
        );
    }

    #[test]
    fn social_accounts() {
        assert_eq!(kind_of("https://twitter.com/rustlang"), Some(SourceKind::Twitter));
        assert_eq!(kind_of("https://x.com/rustlang"), Some(SourceKind::Twitter));
        assert_eq!(kind_of("https://x.com/home"), None);
        assert_eq!(kind_of("https://www.instagram.com/nasa/"), Some(SourceKind::Instagram));
        assert_eq!(kind_of("https://www.tiktok.com/@nasa"), Some(SourceKind::Tiktok));
        assert_eq!(
            social_handle(SourceKind::Twitter, "https://x.com/rustlang").as_deref(),
            Some("rustlang")
        );
        assert_eq!(social_handle(SourceKind::Instagram, "https://x.com/rustlang"), None);
    }

    #[test]
    fn platform_beats_feed_path() {
        // A YouTube URL that also ends in .xml stays a channel.
        assert_eq!(
            kind_of("https://www.youtube.com/feeds/videos.xml?channel_id=UC123"),
            Some(SourceKind::YoutubeChannel)
        );
    }

    #[test]
    fn podcast_hosts_beat_feed_path() {
        let c = match_url(&Url::parse("https://feeds.buzzsprout.com/12345.rss").unwrap()).unwrap();
        assert_eq!(c.kind, Some(SourceKind::Podcast));
        assert!(c.suggested_feed_url.is_some());

        assert_eq!(
            kind_of("https://podcasts.apple.com/us/podcast/show/id123456"),
            Some(SourceKind::Podcast)
        );
        assert_eq!(kind_of("https://open.spotify.com/show/abc"), Some(SourceKind::Podcast));
        assert_eq!(kind_of("https://open.spotify.com/track/abc"), None);
    }

    #[test]
    fn generic_feed_paths() {
        for url in [
            "https://blog.example.com/feed/",
            "https://blog.example.com/rss",
            "https://example.com/atom.xml",
            "https://example.com/index.rss",
            "https://example.com/feed/posts",
        ] {
            assert_eq!(kind_of(url), Some(SourceKind::Feed), "{url}");
        }
        assert_eq!(kind_of("https://example.com/blog/hello-world"), None);
    }
}
