pub mod app_state;
pub mod auth;
pub mod classifier;
pub mod config;
pub mod entities;
pub mod entries;
pub mod extractor;
pub mod feeds;
pub mod fetcher;
pub mod health;
pub mod interactions;
pub mod logging;
pub mod rate_limit;
pub mod repositories;
pub mod retry;
pub mod router;
pub mod scheduler;
pub mod slug;
pub mod subscriptions;
pub mod sync;
