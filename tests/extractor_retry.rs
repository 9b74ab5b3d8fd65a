use std::sync::Arc;
use std::time::Duration;

use gatherer::config::HttpConfig;
use gatherer::extractor::{ContentExtractor, ExtractError, ExtractOptions};
use gatherer::fetcher::{FetchError, HttpClient};
use gatherer::retry::{Backoff, RetryPolicy};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

const ARTICLE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><title>Retries Under Load</title></head>
<body>
  <article>
    <h1>Retries Under Load</h1>
    <p>Transient upstream failures are a fact of life for anything that polls the open web.
    A server that answers with a 503 one minute is often perfectly healthy the next, so a
    small number of spaced out attempts recovers most of them without hammering anyone.</p>
    <p>Permanent failures are different: a page that is gone stays gone, and asking again
    only wastes time that other sources in the same batch could have used instead.</p>
  </article>
</body>
</html>"#;

fn extractor() -> ContentExtractor {
    let client = Arc::new(HttpClient::new(HttpConfig::default()).unwrap());
    let policy = RetryPolicy::new(
        3,
        Backoff::Fixed(Duration::from_millis(10)),
        ExtractError::should_retry,
    );
    ContentExtractor::with_policy(client, policy)
}

#[tokio::test]
async fn recovers_on_third_attempt_after_two_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(ARTICLE.as_bytes())
                .insert_header("Content-Type", "text/html; charset=utf-8"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/article", mock_server.uri());
    let content = extractor()
        .extract(&url, &ExtractOptions::default())
        .await
        .unwrap();

    assert!(content.title.contains("Retries Under Load"));
    assert!(content.text_content.contains("Transient upstream failures"));
}

#[tokio::test]
async fn not_found_is_tried_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/gone", mock_server.uri());
    let err = extractor()
        .extract(&url, &ExtractOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExtractError::Fetch(FetchError::Http { status, .. }) if status.as_u16() == 404
    ));
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&mock_server)
        .await;

    let url = format!("{}/down", mock_server.uri());
    let err = extractor()
        .extract(&url, &ExtractOptions::default())
        .await
        .unwrap_err();

    assert!(err.should_retry());
}

#[tokio::test]
async fn empty_page_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/blank"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes("<html><body></body></html>".as_bytes())
                .insert_header("Content-Type", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/blank", mock_server.uri());
    let err = extractor()
        .extract(&url, &ExtractOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::Empty(_)));
}
