//! HTTP API: prediction endpoint, probes, metrics and OpenAPI docs.

pub mod docs;
pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
