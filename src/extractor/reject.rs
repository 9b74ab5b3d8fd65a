use serde::Serialize;

const MIN_CONTENT_LENGTH: usize = 250;
const MIN_WORD_COUNT: usize = 50;
const MAX_BOILERPLATE_RATIO: f64 = 0.3;

const BOILERPLATE_KEYWORDS: &[&str] = &[
    "cookie",
    "privacy",
    "terms",
    "policy",
    "gdpr",
    "consent",
    "accept",
    "preferences",
    "tracking",
    "advertisement",
    "subscribe",
    "newsletter",
    "login",
    "sign up",
    "register",
    "password",
    "404",
    "not found",
    "access denied",
    "please wait",
    "javascript",
    "enable",
    "browser",
    "click here",
];

/// Why an extracted body was judged unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Nothing readable was recovered.
    Empty,
    TooShort,
    /// Cookie walls, login prompts, error pages.
    Boilerplate,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Empty => write!(f, "no readable content"),
            RejectReason::TooShort => write!(f, "content too short"),
            RejectReason::Boilerplate => write!(f, "content is mostly boilerplate"),
        }
    }
}

pub fn check(title: &str, text: &str) -> Option<RejectReason> {
    if text.trim().is_empty() {
        return Some(RejectReason::Empty);
    }
    if text.chars().count() < MIN_CONTENT_LENGTH {
        return Some(RejectReason::TooShort);
    }

    let word_count = text.split_whitespace().count();
    if title.trim().is_empty() && word_count < MIN_WORD_COUNT {
        return Some(RejectReason::TooShort);
    }

    if boilerplate_ratio(text, word_count) > MAX_BOILERPLATE_RATIO {
        return Some(RejectReason::Boilerplate);
    }

    None
}

fn boilerplate_ratio(text: &str, total_words: usize) -> f64 {
    if total_words == 0 {
        return 0.0;
    }
    let lower = text.to_lowercase();
    let hits: usize = BOILERPLATE_KEYWORDS.iter().map(|k| lower.matches(k).count()).sum();
    hits as f64 / total_words as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_and_empty_content() {
        assert_eq!(check("Title", "   "), Some(RejectReason::Empty));
        assert_eq!(check("Title", "Short"), Some(RejectReason::TooShort));
        assert_eq!(check("Title", &"Long enough content ".repeat(50)), None);
    }

    #[test]
    fn untitled_pages_need_more_words() {
        let text = "A sentence of moderate length with several words. ".repeat(6);
        assert!(text.chars().count() >= MIN_CONTENT_LENGTH);
        assert_eq!(check("", &text), Some(RejectReason::TooShort));
        assert_eq!(check("Good Title", &text), None);
    }

    #[test]
    fn rejects_cookie_walls() {
        let text = "cookie consent privacy policy terms gdpr tracking advertisement ".repeat(20);
        assert_eq!(check("Title", &text), Some(RejectReason::Boilerplate));
    }

    #[test]
    fn accepts_good_content() {
        let text = "This is a high-quality article with substantial content that provides value to readers. ".repeat(10);
        assert_eq!(check("Good Article Title", &text), None);
    }
}
