use ammonia::Builder;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use url::Url;

use crate::extractor::model::{ReadabilityResult, normalize_whitespace};

static HREF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"href="([^"]+)""#).unwrap());
static SRC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"src="([^"]+)""#).unwrap());
static IMG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img\b[^>]*\bsrc="([^"]*)"[^>]*>"#).unwrap());
static EMPTY_FIGURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<figure>\s*(<figcaption>\s*</figcaption>)?\s*</figure>").unwrap());

/// Sanitize the extracted HTML, make links absolute and drop the featured
/// image when the page repeats it inline.
pub fn sanitize_and_resolve_links(
    result: &mut ReadabilityResult,
    base_url: &Url,
    featured_image_url: Option<&Url>,
) {
    let clean_html = Builder::default().clean(&result.html).to_string();
    let mut html = resolve_links(&clean_html, base_url);

    if let Some(featured) = featured_image_url {
        html = remove_featured_image(&html, featured);
    }

    result.html = html;
    result.text = normalize_whitespace(&result.text);
}

fn resolve_attr(re: &Regex, attr: &str, html: &str, base_url: &Url) -> String {
    re.replace_all(html, |caps: &Captures| match base_url.join(&caps[1]) {
        Ok(absolute) => format!(r#"{attr}="{absolute}""#),
        Err(_) => caps[0].to_string(),
    })
    .into_owned()
}

fn resolve_links(html: &str, base_url: &Url) -> String {
    let html = resolve_attr(&HREF, "href", html, base_url);
    resolve_attr(&SRC, "src", &html, base_url)
}

/// Scheme, host and path, ignoring query and fragment. CDNs often append
/// sizing parameters to the same asset.
fn same_asset(candidate: &str, featured: &Url) -> bool {
    let Ok(candidate) = Url::parse(&candidate.replace("&amp;", "&")) else {
        return false;
    };
    candidate.host_str() == featured.host_str() && candidate.path() == featured.path()
}

fn remove_featured_image(html: &str, featured: &Url) -> String {
    let stripped = IMG_TAG.replace_all(html, |caps: &Captures| {
        if same_asset(&caps[1], featured) {
            String::new()
        } else {
            caps[0].to_string()
        }
    });
    EMPTY_FIGURE.replace_all(&stripped, "").into_owned()
}
