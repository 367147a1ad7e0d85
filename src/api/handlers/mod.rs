//! REST endpoint handlers organized by resource.

pub mod changes;
pub mod hosts;
pub mod system;

use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::Serialize;

use crate::api::dto::PageDto;
use crate::app_state::AppState;
use crate::query::Pagination;
use crate::service::Outcome;

/// Number of stored records left out of a response because they could
/// not be decoded.
pub const SKIPPED_RECORDS: HeaderName = HeaderName::from_static("x-skipped-records");

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(hosts::routes())
        .merge(changes::routes())
}

/// Renders a list result: a [`PageDto`] when a page was requested, a bare
/// array otherwise.
fn page_response<T, D>(outcome: Outcome<Pagination<T>>, paged: bool) -> Response
where
    D: From<T> + Serialize,
{
    let page = outcome.value.map(D::from);
    let response = if paged {
        Json(PageDto::from(page)).into_response()
    } else {
        Json(page.content).into_response()
    };
    with_skipped(response, outcome.skipped)
}

fn with_skipped(mut response: Response, skipped: usize) -> Response {
    response
        .headers_mut()
        .insert(SKIPPED_RECORDS, HeaderValue::from(skipped));
    response
}
