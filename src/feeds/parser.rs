use chrono::{DateTime, Utc};
use feed_rs::model::{Entry as FeedEntry, Link};
use feed_rs::parser;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

use super::{FeedDocument, FeedError, MediaKind, MediaRef, RawEntry};

static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img[src]").unwrap());

// feed-rs folds RSS <enclosure> into the same MediaObject as media:content.
static ENCLOSURE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<enclosure\b[^>]*?\burl\s*=\s*["']([^"']+)["']"#).unwrap()
});

/// Parse RSS 0.9x/1.0/2.0, Atom or JSON Feed bytes. Entry links, media and
/// the site link are resolved against `base_url`.
pub fn parse_feed(bytes: &[u8], base_url: &Url) -> Result<FeedDocument, FeedError> {
    let feed = parser::parse(bytes)?;
    let enclosures = enclosure_urls(bytes, base_url);

    let title = feed.title.map(|t| t.content.trim().to_string()).filter(|t| !t.is_empty());
    let site_url = preferred_link(&feed.links).and_then(|href| resolve(base_url, href));

    let total = feed.entries.len();
    let entries: Vec<RawEntry> = feed
        .entries
        .iter()
        .filter_map(|entry| raw_entry(entry, base_url, &enclosures))
        .collect();

    if entries.len() < total {
        debug!(dropped = total - entries.len(), "entries without a usable link dropped");
    }

    Ok(FeedDocument {
        url: base_url.clone(),
        title,
        site_url,
        entries,
    })
}

/// URLs declared by RSS `<enclosure>` elements anywhere in the document.
fn enclosure_urls(bytes: &[u8], base_url: &Url) -> HashSet<Url> {
    let text = String::from_utf8_lossy(bytes);
    ENCLOSURE_URL
        .captures_iter(&text)
        .filter_map(|caps| resolve(base_url, &caps[1].replace("&amp;", "&")))
        .collect()
}

fn raw_entry(entry: &FeedEntry, base_url: &Url, enclosures: &HashSet<Url>) -> Option<RawEntry> {
    let link = entry_link(entry, base_url)?;

    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| link.to_string());

    let content = entry
        .content
        .as_ref()
        .and_then(|c| c.body.clone())
        .filter(|b| !b.trim().is_empty());
    let summary = entry
        .summary
        .as_ref()
        .map(|s| s.content.clone())
        .filter(|s| !s.trim().is_empty());

    let author = entry
        .authors
        .iter()
        .map(|p| p.name.trim())
        .find(|n| !n.is_empty())
        .map(str::to_string);

    let published_at: Option<DateTime<Utc>> = entry.published.or(entry.updated);

    let body_html = content.as_deref().or(summary.as_deref());
    let media = select_media(entry, body_html, &link, enclosures);

    Some(RawEntry {
        title,
        link,
        content,
        summary,
        author,
        published_at,
        media,
    })
}

/// The alternate (or first plain) link, falling back to an http(s) id.
fn entry_link(entry: &FeedEntry, base_url: &Url) -> Option<Url> {
    if let Some(href) = preferred_link(&entry.links)
        && let Some(url) = resolve(base_url, href)
    {
        return Some(url);
    }

    let id = entry.id.trim();
    if id.starts_with("http://") || id.starts_with("https://") {
        return Url::parse(id).ok();
    }
    None
}

fn preferred_link(links: &[Link]) -> Option<&str> {
    links
        .iter()
        .find(|l| {
            !l.href.trim().is_empty()
                && l.rel
                    .as_deref()
                    .is_none_or(|rel| rel.eq_ignore_ascii_case("alternate"))
        })
        .or_else(|| {
            links.iter().find(|l| {
                !l.href.trim().is_empty()
                    && !l.rel.as_deref().is_some_and(|rel| {
                        rel.eq_ignore_ascii_case("self") || rel.eq_ignore_ascii_case("enclosure")
                    })
            })
        })
        .map(|l| l.href.trim())
}

fn resolve(base: &Url, href: &str) -> Option<Url> {
    let url = base.join(href.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

fn kind_for_mime(mime: &str) -> Option<MediaKind> {
    match mime.split('/').next()? {
        "image" => Some(MediaKind::Image),
        "audio" => Some(MediaKind::Audio),
        "video" => Some(MediaKind::Video),
        _ => None,
    }
}

/// Media-specific tags win over image enclosures, which win over the first
/// `<img>` in the body. Audio and video enclosures are the last resort so
/// podcast episodes still carry their file.
fn select_media(
    entry: &FeedEntry,
    body_html: Option<&str>,
    base: &Url,
    enclosures: &HashSet<Url>,
) -> Option<MediaRef> {
    // media:thumbnail, itunes:image, YouTube media:group thumbnails
    for object in &entry.media {
        for thumbnail in &object.thumbnails {
            if let Some(url) = resolve(base, &thumbnail.image.uri) {
                return Some(MediaRef {
                    url,
                    mime_type: None,
                    kind: MediaKind::Image,
                });
            }
        }
    }

    let mut enclosure_image: Option<MediaRef> = None;
    let mut playable: Option<MediaRef> = None;

    // media:content and RSS enclosures share this list; document order is
    // not a ranking.
    for object in &entry.media {
        for content in &object.content {
            let Some(url) = content.url.as_ref().and_then(|u| resolve(base, u.as_str())) else {
                continue;
            };
            let mime = content.content_type.as_ref().map(|m| m.to_string());
            match mime.as_deref().and_then(kind_for_mime) {
                Some(MediaKind::Image) if enclosures.contains(&url) => {
                    if enclosure_image.is_none() {
                        enclosure_image = Some(MediaRef {
                            url,
                            mime_type: mime,
                            kind: MediaKind::Image,
                        });
                    }
                }
                Some(MediaKind::Image) => {
                    return Some(MediaRef {
                        url,
                        mime_type: mime,
                        kind: MediaKind::Image,
                    });
                }
                Some(kind) if playable.is_none() => {
                    playable = Some(MediaRef {
                        url,
                        mime_type: mime,
                        kind,
                    });
                }
                _ => {}
            }
        }
    }

    if enclosure_image.is_some() {
        return enclosure_image;
    }

    // Atom enclosures
    for link in &entry.links {
        if !link.rel.as_deref().is_some_and(|r| r.eq_ignore_ascii_case("enclosure")) {
            continue;
        }
        let Some(url) = resolve(base, &link.href) else {
            continue;
        };
        match link.media_type.as_deref().and_then(kind_for_mime) {
            Some(MediaKind::Image) => {
                return Some(MediaRef {
                    url,
                    mime_type: link.media_type.clone(),
                    kind: MediaKind::Image,
                });
            }
            Some(kind) if playable.is_none() => {
                playable = Some(MediaRef {
                    url,
                    mime_type: link.media_type.clone(),
                    kind,
                });
            }
            _ => {}
        }
    }

    if let Some(url) = body_html.and_then(|html| first_image(html, base)) {
        return Some(MediaRef {
            url,
            mime_type: None,
            kind: MediaKind::Image,
        });
    }

    playable
}

pub(crate) fn first_image(html: &str, base: &Url) -> Option<Url> {
    let fragment = Html::parse_fragment(html);
    fragment
        .select(&IMG)
        .filter_map(|img| img.value().attr("src"))
        .find_map(|src| resolve(base, src))
}
