pub mod dtos;
pub mod jwt;
pub mod middleware;

pub use jwt::JwtService;
pub use middleware::{AuthError, CallerIdentity};
