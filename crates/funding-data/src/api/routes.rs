//! API routes for the funding data service.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers::*;
use crate::service::QueryService;

/// Create the service router.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/samples/latest", get(get_latest_sample))
        .route("/api/v1/samples/latest/full", get(get_latest_sample_full))
        .route("/api/v1/samples", get(list_samples))
        .route("/api/v1/analytics/rates", get(get_rate_stats))
        .route("/api/v1/analytics/reference", get(get_reference_stats))
        .route(
            "/api/v1/instruments/:instrument_id/history",
            get(get_instrument_history),
        )
        .route(
            "/api/v1/instruments/:instrument_id/history/:duration",
            get(get_instrument_history_by_duration),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

pub fn create_api_state(service: QueryService) -> ApiState {
    ApiState {
        service: Arc::new(service),
    }
}
