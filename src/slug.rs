//! URL slugs of the form `{id}--{ascii-title}`.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use uuid::Uuid;

const MAX_TITLE_SLUG_LEN: usize = 80;
const SEPARATOR: &str = "--";

/// Accent-stripped, lowercased, ASCII-only rendering of `title` with words
/// joined by single hyphens, at most 80 characters.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for ch in title.nfd().filter(|c| !is_combining_mark(*c)) {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_hyphen = true;
        }
    }

    if slug.len() > MAX_TITLE_SLUG_LEN {
        slug.truncate(MAX_TITLE_SLUG_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    slug
}

pub fn entry_slug(id: &str, title: &str) -> String {
    let title_slug = slugify(title);
    if title_slug.is_empty() {
        id.to_string()
    } else {
        format!("{id}{SEPARATOR}{title_slug}")
    }
}

/// Recover the entry id from a slug produced by [`entry_slug`].
pub fn id_from_slug(slug: &str) -> Option<Uuid> {
    let id = slug.split_once(SEPARATOR).map_or(slug, |(id, _)| id);
    Uuid::parse_str(id).ok()
}
