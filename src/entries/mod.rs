//! Read access to reconciled entries, addressed by `{id}--{title}` slugs.

pub mod dtos;
pub mod handlers;
