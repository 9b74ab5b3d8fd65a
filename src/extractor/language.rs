use whatlang::{Lang, detect};

const MIN_CONFIDENCE: f64 = 0.25;
const MIN_TEXT_LENGTH: usize = 50;

const ISO_639_1: &[(Lang, &str)] = &[
    (Lang::Eng, "en"),
    (Lang::Spa, "es"),
    (Lang::Fra, "fr"),
    (Lang::Deu, "de"),
    (Lang::Por, "pt"),
    (Lang::Ita, "it"),
    (Lang::Nld, "nl"),
    (Lang::Pol, "pl"),
    (Lang::Rus, "ru"),
    (Lang::Ukr, "uk"),
    (Lang::Tur, "tr"),
    (Lang::Swe, "sv"),
    (Lang::Dan, "da"),
    (Lang::Fin, "fi"),
    (Lang::Ces, "cs"),
    (Lang::Ell, "el"),
    (Lang::Heb, "he"),
    (Lang::Ara, "ar"),
    (Lang::Hin, "hi"),
    (Lang::Cmn, "zh"),
    (Lang::Jpn, "ja"),
    (Lang::Kor, "ko"),
    (Lang::Tha, "th"),
    (Lang::Vie, "vi"),
    (Lang::Ind, "id"),
];

/// ISO 639-1 code of the dominant language, when detection is confident.
pub fn detect_language(text: &str) -> Option<String> {
    if text.trim().len() < MIN_TEXT_LENGTH {
        return None;
    }

    let info = detect(text)?;
    if info.confidence() < MIN_CONFIDENCE {
        return None;
    }

    let lang = info.lang();
    let code = ISO_639_1
        .iter()
        .find(|(l, _)| *l == lang)
        .map(|(_, code)| (*code).to_string())
        .unwrap_or_else(|| lang.code().to_string());
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_english() {
        let text = "This is a test of the English language detection system. It should work well.";
        assert_eq!(detect_language(text).as_deref(), Some("en"));
    }

    #[test]
    fn detects_spanish() {
        let text = "Esto es una prueba del sistema de detección de idiomas en español. Debería funcionar bien.";
        assert_eq!(detect_language(text).as_deref(), Some("es"));
    }

    #[test]
    fn short_text_is_undetermined() {
        assert_eq!(detect_language("Short"), None);
    }

    #[test]
    fn symbols_are_undetermined() {
        let text =
            "1 2 3 4 5 6 7 8 9 0 ! @ # $ % ^ & * ( ) - = + [ ] { } | \\ : ; \" ' < > , . ? /";
        assert_eq!(detect_language(text), None);
    }
}
