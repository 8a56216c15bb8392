//! API Layer
//!
//! HTTP API endpoints and request handling for the account service.

pub mod handlers;
pub mod middleware;
pub mod routes;

// Re-export commonly used types
pub use handlers::{AppState, SuccessResponse};
pub use middleware::{auth_middleware, security_headers_middleware, AuthUser};
pub use routes::{create_routes, RouterBuilder};
