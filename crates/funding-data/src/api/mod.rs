//! HTTP binding for the query service.

pub mod handlers;
pub mod models;
pub mod routes;

pub use handlers::ApiState;
pub use routes::create_router;
