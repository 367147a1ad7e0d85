//! Host handlers: as-of listing, single host lookup and single trail.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use super::{page_response, with_skipped};
use crate::api::dto::{HostDto, ListParams, LookupParams, PageDto, TrailDto};
use crate::app_state::AppState;
use crate::domain::{Snapshot, SubEntityKind};
use crate::error::{ErrorResponse, GatewayError};

/// `GET /hosts`: Hosts as of a cutoff.
///
/// # Errors
///
/// Returns [`GatewayError`] on invalid parameters or store failure.
#[utoipa::path(
    get,
    path = "/api/v1/hosts",
    tag = "Hosts",
    summary = "List hosts as of a cutoff",
    description = "Resolves every host matching the filters at `older-than` (default: live state). Returns a bare array unless both `page` and `size` are given.",
    params(ListParams),
    responses(
        (status = 200, description = "Resolved hosts", body = PageDto<HostDto>),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn list_hosts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Response, GatewayError> {
    let query = params.to_query()?;
    let outcome = state.history_service.list_as_of(&query).await?;
    Ok(page_response::<Snapshot, HostDto>(
        outcome,
        query.page.is_paged(),
    ))
}

/// `GET /hosts/{hostname}`: One host as of a cutoff.
///
/// # Errors
///
/// Returns [`GatewayError::NotFound`] if the host does not resolve.
#[utoipa::path(
    get,
    path = "/api/v1/hosts/{hostname}",
    tag = "Hosts",
    summary = "Get a host as of a cutoff",
    description = "Returns the snapshot representing the host at `older-than`.",
    params(
        ("hostname" = String, Path, description = "Host name"),
        LookupParams,
    ),
    responses(
        (status = 200, description = "Resolved host", body = HostDto),
        (status = 404, description = "No snapshot at this cutoff", body = ErrorResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn get_host(
    State(state): State<AppState>,
    Path(hostname): Path<String>,
    Query(params): Query<LookupParams>,
) -> Result<impl IntoResponse, GatewayError> {
    let snapshot = state
        .history_service
        .get_one_as_of(&hostname, &params.filter(), params.cutoff()?)
        .await?;
    Ok(Json(HostDto::from(snapshot)))
}

/// `GET /hosts/{hostname}/{kind}/{name}/changes`: Change trail of one
/// sub-entity.
///
/// # Errors
///
/// Returns [`GatewayError::NotFound`] if the host does not resolve, or
/// [`GatewayError::InvalidRequest`] on an unknown kind.
#[utoipa::path(
    get,
    path = "/api/v1/hosts/{hostname}/{kind}/{name}/changes",
    tag = "Changes",
    summary = "Get the change trail of a sub-entity",
    description = "Resolves the host at `older-than`, then returns one record per historical snapshot containing the named sub-entity. PDB names are `<database>/<pdb>` with the slash percent-encoded.",
    params(
        ("hostname" = String, Path, description = "Host name"),
        ("kind" = String, Path, description = "`database`, `pdb` or `diskGroup`"),
        ("name" = String, Path, description = "Sub-entity name"),
        LookupParams,
    ),
    responses(
        (status = 200, description = "Change trail", body = TrailDto),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 404, description = "Host not found at this cutoff", body = ErrorResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn get_host_trail(
    State(state): State<AppState>,
    Path((hostname, kind, name)): Path<(String, String, String)>,
    Query(params): Query<LookupParams>,
) -> Result<Response, GatewayError> {
    let kind: SubEntityKind = kind.parse()?;
    let outcome = state
        .history_service
        .get_trail(
            &hostname,
            kind,
            &name,
            &params.filter(),
            params.cutoff()?,
            params.direction()?,
        )
        .await?;
    let response = Json(TrailDto::from(outcome.value)).into_response();
    Ok(with_skipped(response, outcome.skipped))
}

/// Host routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/hosts", get(list_hosts))
        .route("/hosts/{hostname}", get(get_host))
        .route("/hosts/{hostname}/{kind}/{name}/changes", get(get_host_trail))
}
