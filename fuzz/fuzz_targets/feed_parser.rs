#![no_main]

use libfuzzer_sys::fuzz_target;
use url::Url;

use gatherer::feeds::parser::parse_feed;

fuzz_target!(|data: &[u8]| {
    let base = Url::parse("https://example.com/feed.xml").unwrap();
    if let Ok(feed) = parse_feed(data, &base) {
        for entry in &feed.entries {
            assert!(matches!(entry.link.scheme(), "http" | "https"));
        }
    }
});
