//! Query parameters and the paging envelope shared by the read endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Cutoff, SortDirection};
use crate::error::GatewayError;
use crate::query::{KeywordSearch, Locations, PageRequest, Pagination, SearchField, SnapshotFilter};
use crate::service::ListQuery;

/// Query parameters of the list endpoints.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "kebab-case")]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Comma separated locations, or `ALL`.
    pub location: Option<String>,
    /// Exact environment (e.g. `PRD`).
    pub environment: Option<String>,
    /// Space separated keywords; all must match.
    pub search: Option<String>,
    /// Comma separated fields searched by `search`.
    pub search_fields: Option<String>,
    /// RFC 3339 instant, or `now` for the live state.
    pub older_than: Option<String>,
    /// Sort field.
    pub sort_by: Option<String>,
    /// Sort descending.
    #[serde(default)]
    pub sort_desc: bool,
    /// Zero-based page number; `-1` returns everything.
    #[serde(default = "all_pages")]
    pub page: i64,
    /// Page size; `-1` returns everything.
    #[serde(default = "all_pages")]
    pub size: i64,
    /// Trail order, `asc` or `desc`.
    pub direction: Option<String>,
}

const fn all_pages() -> i64 {
    -1
}

impl ListParams {
    /// Converts the raw parameters into a [`ListQuery`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] on a malformed
    /// `older-than` or an unknown search field.
    pub fn to_query(&self) -> Result<ListQuery, GatewayError> {
        Ok(ListQuery {
            filter: filter(self.location.as_deref(), self.environment.as_deref()),
            search: KeywordSearch::parse(self.search.as_deref().unwrap_or_default()),
            search_fields: SearchField::parse_list(
                self.search_fields.as_deref().unwrap_or_default(),
            )?,
            cutoff: Cutoff::from_param(self.older_than.as_deref())?,
            sort_by: self.sort_by.clone().unwrap_or_default(),
            sort_desc: self.sort_desc,
            page: PageRequest::new(self.page, self.size),
        })
    }

    /// Parses `direction`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] on an unknown direction.
    pub fn direction(&self) -> Result<SortDirection, GatewayError> {
        self.direction.as_deref().unwrap_or_default().parse()
    }
}

/// Query parameters of the single-host endpoints.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "kebab-case")]
#[into_params(parameter_in = Query)]
pub struct LookupParams {
    /// Comma separated locations, or `ALL`.
    pub location: Option<String>,
    /// Exact environment.
    pub environment: Option<String>,
    /// RFC 3339 instant, or `now` for the live state.
    pub older_than: Option<String>,
    /// Trail order, `asc` or `desc`.
    pub direction: Option<String>,
}

impl LookupParams {
    /// Location and environment predicate.
    #[must_use]
    pub fn filter(&self) -> SnapshotFilter {
        filter(self.location.as_deref(), self.environment.as_deref())
    }

    /// Parses `older-than`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] on a malformed instant.
    pub fn cutoff(&self) -> Result<Cutoff, GatewayError> {
        Cutoff::from_param(self.older_than.as_deref())
    }

    /// Parses `direction`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] on an unknown direction.
    pub fn direction(&self) -> Result<SortDirection, GatewayError> {
        self.direction.as_deref().unwrap_or_default().parse()
    }
}

fn filter(location: Option<&str>, environment: Option<&str>) -> SnapshotFilter {
    SnapshotFilter::new(
        Locations::parse(location.unwrap_or_default()),
        environment.unwrap_or_default(),
    )
}

/// Paging envelope returned when `page` and `size` select a page.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageDto<T> {
    /// Items of this page.
    pub content: Vec<T>,
    /// Items across all pages.
    pub total_elements: u64,
    /// Number of pages.
    pub total_pages: u64,
    /// Zero-based page number.
    pub page_number: u64,
    /// Page size.
    pub page_size: u64,
    /// `true` on the first page.
    pub first: bool,
    /// `true` on the last page.
    pub last: bool,
    /// `true` when this page holds no items.
    pub empty: bool,
}

impl<T> From<Pagination<T>> for PageDto<T> {
    fn from(page: Pagination<T>) -> Self {
        Self {
            content: page.content,
            total_elements: page.total_elements,
            total_pages: page.total_pages,
            page_number: page.page_number,
            page_size: page.page_size,
            first: page.first,
            last: page.last,
            empty: page.empty,
        }
    }
}
