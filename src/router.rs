use axum::{
    Json, Router,
    routing::{delete, get, post, put},
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{app_state::AppState, auth, entries, health, interactions, subscriptions, sync};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        sync::handlers::trigger_sync,
        subscriptions::handlers::list_sources,
        subscriptions::handlers::subscribe,
        subscriptions::handlers::unsubscribe,
        entries::handlers::list_entries,
        entries::handlers::get_entry,
        interactions::handlers::get_interaction,
        interactions::handlers::mark_read,
        interactions::handlers::toggle_favorite,
        interactions::handlers::set_archived,
        interactions::handlers::record_progress,
    ),
    components(schemas(
        health::HealthResponse,
        auth::dtos::ErrorResponse,
        sync::dtos::SyncRequest,
        sync::dtos::SourceSyncResponse,
        sync::dtos::BatchSyncResponse,
        subscriptions::dtos::SubscribeRequest,
        subscriptions::dtos::SubscribeResponse,
        subscriptions::dtos::SourceResponse,
        subscriptions::dtos::RedirectNotice,
        entries::dtos::EntryResponse,
        interactions::dtos::ReadRequest,
        interactions::dtos::ArchiveRequest,
        interactions::dtos::ProgressRequest,
        interactions::dtos::InteractionResponse,
    ))
)]
pub struct ApiDoc;

pub fn router(state: AppState) -> Router {
    let interaction = "/v1/interactions/{kind}/{id}";

    Router::new()
        .route("/healthz", get(health::health_check))
        .route("/v1/sync", post(sync::handlers::trigger_sync))
        .route(
            "/v1/sources",
            get(subscriptions::handlers::list_sources).post(subscriptions::handlers::subscribe),
        )
        .route("/v1/sources/{id}", delete(subscriptions::handlers::unsubscribe))
        .route("/v1/sources/{id}/entries", get(entries::handlers::list_entries))
        .route("/v1/entries/{slug}", get(entries::handlers::get_entry))
        .route(interaction, get(interactions::handlers::get_interaction))
        .route(&format!("{interaction}/read"), put(interactions::handlers::mark_read))
        .route(&format!("{interaction}/favorite"), post(interactions::handlers::toggle_favorite))
        .route(&format!("{interaction}/archive"), put(interactions::handlers::set_archived))
        .route(&format!("{interaction}/progress"), put(interactions::handlers::record_progress))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .with_state(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
