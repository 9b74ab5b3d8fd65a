//! Subscribing users to sources. Sources are shared: the second user to
//! subscribe to a URL joins the existing source, and the last one to leave
//! soft-deletes it. Hard deletion happens only in [`SubscriptionService::sweep`].

pub mod dtos;
pub mod handlers;
pub mod service;

pub use service::{SubscribeError, Subscribed, SubscriptionService};
