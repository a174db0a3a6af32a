//! HTTP request handlers

use crate::api::AppContext;
use crate::ingest::ConnectionStatus;
use crate::model::Alert;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::{debug, error};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    alerts: Vec<Alert>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "greenhouse-alerts".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/alerts - current ordered alert sequence
pub async fn get_alerts(State(ctx): State<AppContext>) -> Json<AlertsResponse> {
    Json(AlertsResponse {
        alerts: ctx.state.alerts().await,
    })
}

/// GET /api/status - current connectivity status
pub async fn get_status(State(ctx): State<AppContext>) -> Json<ConnectionStatus> {
    Json(ctx.state.status().await)
}

/// POST /api/alerts/:id/acknowledge
///
/// A stale id (cleared or never existed) answers 404 and changes nothing.
pub async fn acknowledge_alert(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<StatusResponse>) {
    match ctx.state.acknowledge(id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusResponse {
                status: "ok".to_string(),
            }),
        ),
        Err(err) => {
            debug!("Acknowledge of stale alert ignored: {}", err);
            (
                StatusCode::NOT_FOUND,
                Json(StatusResponse {
                    status: "unknown_alert".to_string(),
                }),
            )
        }
    }
}

/// POST /api/alerts/clear
///
/// Awaits the storage removal so the caller gets a definite completion
/// signal before clearing its own view.
pub async fn clear_alerts(State(ctx): State<AppContext>) -> (StatusCode, Json<StatusResponse>) {
    match ctx.state.clear_all().await {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusResponse {
                status: "ok".to_string(),
            }),
        ),
        Err(err) => {
            error!("Failed to clear persisted alerts: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResponse {
                    status: format!("storage error: {}", err),
                }),
            )
        }
    }
}
