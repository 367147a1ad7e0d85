//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Read endpoints are mounted under `/api/v1`; health and configuration
//! endpoints at the root.

pub mod dto;
pub mod handlers;

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document of the read API.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "hostdata-gateway",
        description = "Point-in-time and change-trail queries over host inventory snapshots"
    ),
    paths(
        handlers::hosts::list_hosts,
        handlers::hosts::get_host,
        handlers::hosts::get_host_trail,
        handlers::changes::list_changes,
        handlers::system::health_handler,
        handlers::system::sub_entity_kinds_handler,
    ),
    components(schemas(
        dto::HostDto,
        dto::TrailDto,
        dto::SubEntityKindDto,
        handlers::system::HealthResponse,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "Hosts", description = "Hosts resolved at a cutoff"),
        (name = "Changes", description = "Sub-entity change trails"),
        (name = "System", description = "Health and configuration"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

/// Builds the served application: routes, tracing, CORS and the request
/// deadline, bound to `state`. A request over the deadline answers
/// `408 Request Timeout`.
pub fn app(state: AppState, request_timeout: Duration) -> Router {
    build_router()
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
