//! Derived change-trail views. Never persisted.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::sub_entity::{SubEntityKind, SubEntityMetrics};
use crate::error::GatewayError;
use crate::query::filter::{SearchField, Searchable};
use crate::query::paging::{SortValue, Sortable};

/// Order of the records inside a trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Oldest first, for trend charts.
    #[default]
    Ascending,
    /// Most recent first.
    Descending,
}

impl FromStr for SortDirection {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            other => Err(GatewayError::InvalidRequest(format!(
                "invalid direction: {other}"
            ))),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => f.write_str("asc"),
            Self::Descending => f.write_str("desc"),
        }
    }
}

/// Metrics of one sub-entity as seen in one historical snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRecord {
    /// `created_at` of the snapshot the values come from.
    pub updated: DateTime<Utc>,
    /// Metric values.
    #[serde(flatten)]
    pub metrics: SubEntityMetrics,
}

/// The change trail of one sub-entity of one host, with the context needed
/// to list trails across hosts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubEntityTrail {
    /// Parent host.
    pub hostname: String,
    /// Parent host location at the resolved snapshot.
    pub location: String,
    /// Parent host environment at the resolved snapshot.
    pub environment: String,
    /// `created_at` of the resolved (current) snapshot.
    pub created_at: DateTime<Utc>,
    /// Sub-entity kind.
    pub kind: SubEntityKind,
    /// Matching name of the sub-entity.
    pub name: String,
    /// Ordered change records.
    pub changes: Vec<ChangeRecord>,
}

impl Searchable for SubEntityTrail {
    fn search_values(&self, field: SearchField) -> Vec<&str> {
        match field {
            SearchField::Hostname => vec![self.hostname.as_str()],
            SearchField::Location => vec![self.location.as_str()],
            SearchField::Environment => vec![self.environment.as_str()],
            SearchField::SubEntityName => vec![self.name.as_str()],
            SearchField::DatabaseName => match self.kind {
                SubEntityKind::Database => vec![self.name.as_str()],
                SubEntityKind::Pdb => self.name.split('/').take(1).collect(),
                SubEntityKind::DiskGroup => Vec::new(),
            },
            SearchField::PdbName => match self.kind {
                SubEntityKind::Pdb => self
                    .name
                    .split_once('/')
                    .map(|(_, pdb)| pdb)
                    .into_iter()
                    .collect(),
                _ => Vec::new(),
            },
            SearchField::DiskGroupName => match self.kind {
                SubEntityKind::DiskGroup => vec![self.name.as_str()],
                _ => Vec::new(),
            },
        }
    }
}

impl Sortable for SubEntityTrail {
    fn sort_value(&self, field: &str) -> Option<SortValue<'_>> {
        match field {
            "hostname" => Some(SortValue::Text(&self.hostname)),
            "location" => Some(SortValue::Text(&self.location)),
            "environment" => Some(SortValue::Text(&self.environment)),
            "name" => Some(SortValue::Text(&self.name)),
            "createdAt" => Some(SortValue::Time(self.created_at)),
            "changeCount" => {
                #[allow(clippy::cast_precision_loss)]
                let count = self.changes.len() as f64;
                Some(SortValue::Number(count))
            }
            _ => None,
        }
    }
}
