//! Change-trail DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ChangeRecord, SubEntityKind, SubEntityTrail};

/// The change trail of one sub-entity of one host.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrailDto {
    /// Parent host.
    pub hostname: String,
    /// Host location at the resolved snapshot.
    pub location: String,
    /// Host environment at the resolved snapshot.
    pub environment: String,
    /// Ingestion time of the resolved snapshot.
    pub created_at: DateTime<Utc>,
    /// Sub-entity kind (`database`, `pdb`, `diskGroup`).
    #[schema(value_type = String)]
    pub kind: SubEntityKind,
    /// Sub-entity name; PDBs are `<database>/<pdb>`.
    pub name: String,
    /// `{updated, <metrics>...}` records in the requested direction.
    #[schema(value_type = Vec<Object>)]
    pub changes: Vec<ChangeRecord>,
}

impl From<SubEntityTrail> for TrailDto {
    fn from(t: SubEntityTrail) -> Self {
        Self {
            hostname: t.hostname,
            location: t.location,
            environment: t.environment,
            created_at: t.created_at,
            kind: t.kind,
            name: t.name,
            changes: t.changes,
        }
    }
}

/// A supported sub-entity kind and the metrics of its change records.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubEntityKindDto {
    /// Path segment used by the change endpoints.
    pub kind: &'static str,
    /// Metric fields of each change record.
    pub metrics: Vec<&'static str>,
}

impl From<SubEntityKind> for SubEntityKindDto {
    fn from(kind: SubEntityKind) -> Self {
        Self {
            kind: kind.as_str(),
            metrics: kind.metric_names().to_vec(),
        }
    }
}
