use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header::AUTHORIZATION},
};
use chrono::{Duration, Utc};
use gatherer::{
    app_state::AppState,
    auth::JwtService,
    config::{Config, HttpConfig},
    entities::{ContentKind, NewEntry},
    fetcher::HttpClient,
    repositories::{MemoryStore, Store},
    router::router,
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "sources-test-secret";
const FEED_URL: &str = "https://blog.example.com/feed/";

fn app(store: Arc<MemoryStore>) -> Router {
    let config = Config::new("postgres://unused", "127.0.0.1:0", SECRET);
    let client = Arc::new(HttpClient::new(HttpConfig::default()).unwrap());
    router(AppState::new(store, client, &config))
}

fn token(user_id: Uuid) -> String {
    JwtService::new(SECRET)
        .generate_token(user_id, Duration::hours(1))
        .unwrap()
}

fn request(method: &str, uri: &str, user_id: Uuid, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {}", token(user_id)));
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn subscribe(app: &Router, user_id: Uuid, url: &str) -> axum::response::Response {
    app.clone()
        .oneshot(request("POST", "/v1/sources", user_id, Some(json!({ "url": url }))))
        .await
        .unwrap()
}

fn new_entry(source_id: Uuid, slug: &str, title: &str, hours_ago: Option<i64>) -> NewEntry {
    NewEntry {
        source_id,
        url: format!("https://blog.example.com/{slug}"),
        kind: ContentKind::Article,
        title: title.into(),
        content: Some(format!("<p>{title}</p>")),
        text_content: Some(title.into()),
        excerpt: None,
        author: None,
        published_at: hours_ago.map(|h| Utc::now() - Duration::hours(h)),
        image_url: None,
        word_count: Some(2),
        reading_time_minutes: Some(1),
        language: None,
    }
}

#[tokio::test]
async fn subscribe_creates_then_shares_a_source() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store.clone());
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    let first = subscribe(&app, alice, FEED_URL).await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first = json_body(first).await;
    assert_eq!(first["created"], true);
    assert_eq!(first["source"]["kind"], "feed");
    assert_eq!(first["source"]["feedUrl"], FEED_URL);
    assert!(first.get("redirect").is_none());

    let second = subscribe(&app, bob, FEED_URL).await;
    assert_eq!(second.status(), StatusCode::OK);
    let second = json_body(second).await;
    assert_eq!(second["created"], false);
    assert_eq!(second["source"]["id"], first["source"]["id"]);

    let listed = app
        .clone()
        .oneshot(request("GET", "/v1/sources", bob, None))
        .await
        .unwrap();
    assert_eq!(listed.status(), StatusCode::OK);
    let listed = json_body(listed).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], first["source"]["id"]);
}

#[tokio::test]
async fn unrecognizable_url_is_unprocessable() {
    let response = subscribe(&app(Arc::new(MemoryStore::new())), Uuid::new_v4(), "not a url").await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(
        json_body(response).await["error"]
            .as_str()
            .unwrap()
            .contains("not a url")
    );
}

#[tokio::test]
async fn last_unsubscribe_soft_deletes_the_source() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store.clone());
    let user_id = Uuid::new_v4();

    let created = json_body(subscribe(&app, user_id, FEED_URL).await).await;
    let source_id: Uuid = serde_json::from_value(created["source"]["id"].clone()).unwrap();

    let stranger = app
        .clone()
        .oneshot(request("DELETE", &format!("/v1/sources/{source_id}"), Uuid::new_v4(), None))
        .await
        .unwrap();
    assert_eq!(stranger.status(), StatusCode::NOT_FOUND);
    assert!(store.source(source_id).unwrap().deleted_at.is_none());

    let response = app
        .clone()
        .oneshot(request("DELETE", &format!("/v1/sources/{source_id}"), user_id, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(store.source(source_id).unwrap().deleted_at.is_some());
}

#[tokio::test]
async fn entries_are_listed_and_resolved_by_slug() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store.clone());
    let user_id = Uuid::new_v4();

    let created = json_body(subscribe(&app, user_id, FEED_URL).await).await;
    let source_id: Uuid = serde_json::from_value(created["source"]["id"].clone()).unwrap();
    store
        .upsert_entry(new_entry(source_id, "older", "Older Post", Some(10)))
        .await
        .unwrap();
    store
        .upsert_entry(new_entry(source_id, "undated", "Undated Post", None))
        .await
        .unwrap();
    let newest = store
        .upsert_entry(new_entry(source_id, "newest", "¡Cómo Configurar tu Feed RSS!", Some(1)))
        .await
        .unwrap()
        .entry;

    let listed = app
        .clone()
        .oneshot(request("GET", &format!("/v1/sources/{source_id}/entries?limit=10"), user_id, None))
        .await
        .unwrap();
    assert_eq!(listed.status(), StatusCode::OK);
    let listed = json_body(listed).await;
    let titles: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["¡Cómo Configurar tu Feed RSS!", "Older Post", "Undated Post"]);

    let slug = listed[0]["slug"].as_str().unwrap().to_string();
    assert_eq!(slug, format!("{}--como-configurar-tu-feed-rss", newest.id));

    let fetched = app
        .clone()
        .oneshot(request("GET", &format!("/v1/entries/{slug}"), user_id, None))
        .await
        .unwrap();
    assert_eq!(fetched.status(), StatusCode::OK);
    let fetched = json_body(fetched).await;
    assert_eq!(fetched["id"], json!(newest.id));
    assert_eq!(fetched["readingTimeMinutes"], 1);

    let foreign = app
        .clone()
        .oneshot(request("GET", &format!("/v1/entries/{slug}"), Uuid::new_v4(), None))
        .await
        .unwrap();
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn interaction_toggles_round_trip() {
    let app = app(Arc::new(MemoryStore::new()));
    let user_id = Uuid::new_v4();
    let base = format!("/v1/interactions/article/{}", Uuid::new_v4());

    let untouched = json_body(
        app.clone()
            .oneshot(request("GET", &base, user_id, None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(untouched["read"], false);
    assert_eq!(untouched["contentKind"], "article");

    let favorite = json_body(
        app.clone()
            .oneshot(request("POST", &format!("{base}/favorite"), user_id, None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(favorite["favorite"], true);

    let archived = json_body(
        app.clone()
            .oneshot(request("PUT", &format!("{base}/archive"), user_id, Some(json!({ "archived": true }))))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(archived["archived"], true);
    assert_eq!(archived["favorite"], true);

    let progress = json_body(
        app.clone()
            .oneshot(request(
                "PUT",
                &format!("{base}/progress"),
                user_id,
                Some(json!({ "percent": 150, "secondsSpent": 30 })),
            ))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(progress["progressPercent"], 100);
    assert_eq!(progress["timeSpentSecs"], 30);
    assert_eq!(progress["read"], true);

    let unread = json_body(
        app.clone()
            .oneshot(request("PUT", &format!("{base}/read"), user_id, Some(json!({ "read": false }))))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(unread["read"], false);
    assert_eq!(unread["progressPercent"], 100);
}

#[tokio::test]
async fn unknown_content_kind_is_bad_request() {
    let response = app(Arc::new(MemoryStore::new()))
        .oneshot(request(
            "GET",
            &format!("/v1/interactions/podcast/{}", Uuid::new_v4()),
            Uuid::new_v4(),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
