//! Web API for sharegate.
//!
//! Owner routes under `/api/files` require a bearer token; share routes
//! under `/api/share` are public and gated by the share link itself.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use middleware::JwtState;
pub use router::create_router;
pub use server::WebServer;
