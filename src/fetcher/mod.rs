pub mod client;
pub mod errors;
pub mod pipeline;
pub mod types;

pub use client::HttpClient;
pub use errors::FetchError;
pub use types::{Charset, ContentClass, PageResponse};
