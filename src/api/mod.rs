//! HTTP presentation-facing surface
//!
//! The presentation layer only reads the ordered alert sequence and the
//! connectivity status, and may acknowledge a single alert or clear
//! everything. Served with axum; real-time updates stream over SSE.

use crate::state::SharedState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod handlers;
pub mod sse;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
}

impl AppContext {
    pub fn new(state: Arc<SharedState>) -> Self {
        Self { state }
    }
}

/// Build the application router
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/alerts", get(handlers::get_alerts))
        .route("/api/status", get(handlers::get_status))
        .route("/api/alerts/:id/acknowledge", post(handlers::acknowledge_alert))
        .route("/api/alerts/clear", post(handlers::clear_alerts))
        .route("/api/events", get(sse::event_stream))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
