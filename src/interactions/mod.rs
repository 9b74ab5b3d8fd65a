//! Per-user state on a piece of content. Rows are created on the first
//! interaction and only removed when the sweep purges the content's source.

pub mod dtos;
pub mod handlers;
pub mod service;

pub use service::InteractionService;
