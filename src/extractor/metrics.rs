use crate::config::DEFAULT_WORDS_PER_MINUTE;

/// Whitespace-delimited token count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Whole minutes, rounded up. A zero rate falls back to the default.
pub fn reading_time_minutes(words: usize, words_per_minute: u32) -> u32 {
    let wpm = if words_per_minute == 0 {
        DEFAULT_WORDS_PER_MINUTE
    } else {
        words_per_minute
    } as usize;
    words.div_ceil(wpm) as u32
}

/// Word count and reading time for a body, or `None` when there is no text.
pub fn derive(text: Option<&str>, words_per_minute: u32) -> Option<(usize, u32)> {
    let words = word_count(text?);
    if words == 0 {
        return None;
    }
    Some((words, reading_time_minutes(words, words_per_minute)))
}
