//! System endpoints: health check and sub-entity kind catalog.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::dto::SubEntityKindDto;
use crate::app_state::AppState;
use crate::domain::SubEntityKind;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /config/sub-entity-kinds`: List sub-entity kinds with trails.
#[utoipa::path(
    get,
    path = "/config/sub-entity-kinds",
    tag = "System",
    summary = "List sub-entity kinds",
    description = "Returns every sub-entity kind the change endpoints accept and the metrics of its records.",
    responses(
        (status = 200, description = "Sub-entity kind catalog", body = Vec<SubEntityKindDto>),
    )
)]
pub async fn sub_entity_kinds_handler() -> impl IntoResponse {
    let kinds: Vec<SubEntityKindDto> = SubEntityKind::ALL
        .into_iter()
        .map(SubEntityKindDto::from)
        .collect();
    (StatusCode::OK, Json(kinds))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/sub-entity-kinds", get(sub_entity_kinds_handler))
}
