//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the application layer.

mod handlers;
mod identity;
mod rate_limit;
mod server;

pub use handlers::{ApiError, AppState};
pub use identity::UserId;
pub use server::HttpServer;
