//! Change-trail listing across hosts.

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::get;

use super::page_response;
use crate::api::dto::{ListParams, PageDto, TrailDto};
use crate::app_state::AppState;
use crate::domain::{SubEntityKind, SubEntityTrail};
use crate::error::{ErrorResponse, GatewayError};

/// `GET /changes/{kind}`: Trails of every sub-entity of a kind.
///
/// # Errors
///
/// Returns [`GatewayError`] on invalid parameters or store failure.
#[utoipa::path(
    get,
    path = "/api/v1/changes/{kind}",
    tag = "Changes",
    summary = "List change trails of a sub-entity kind",
    description = "Resolves every matching host at `older-than` and returns one trail per host and sub-entity of the kind. Sorting and paging apply to these rows.",
    params(
        ("kind" = String, Path, description = "`database`, `pdb` or `diskGroup`"),
        ListParams,
    ),
    responses(
        (status = 200, description = "Change trails", body = PageDto<TrailDto>),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn list_changes(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Response, GatewayError> {
    let kind: SubEntityKind = kind.parse()?;
    let query = params.to_query()?;
    let outcome = state
        .history_service
        .list_all_trails(&query, kind, params.direction()?)
        .await?;
    Ok(page_response::<SubEntityTrail, TrailDto>(
        outcome,
        query.page.is_paged(),
    ))
}

/// Change routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/changes/{kind}", get(list_changes))
}
