//! Host snapshot DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::Snapshot;
use crate::domain::snapshot::HostFeatures;

/// A host as resolved at the requested cutoff.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostDto {
    /// Snapshot identifier.
    pub id: uuid::Uuid,
    /// Host name.
    pub hostname: String,
    /// Ingestion time of the resolved snapshot.
    pub created_at: DateTime<Utc>,
    /// Retirement time, if the host was dismissed.
    pub dismissed_at: Option<DateTime<Utc>>,
    /// `true` if the snapshot has been superseded.
    pub archived: bool,
    /// Host location.
    pub location: String,
    /// Host environment.
    pub environment: String,
    /// Free-form host information.
    #[schema(value_type = Object)]
    pub info: serde_json::Value,
    /// Technology features (databases, PDBs, disk groups).
    #[schema(value_type = Object)]
    pub features: HostFeatures,
    /// Sum of the databases' daily CPU usage.
    #[serde(rename = "totalDailyCPUUsage")]
    pub total_daily_cpu_usage: f64,
}

impl From<Snapshot> for HostDto {
    fn from(s: Snapshot) -> Self {
        Self {
            id: *s.id.as_uuid(),
            hostname: s.hostname,
            created_at: s.created_at,
            dismissed_at: s.dismissed_at,
            archived: s.archived,
            location: s.location,
            environment: s.environment,
            info: s.info,
            features: s.features,
            total_daily_cpu_usage: s.total_daily_cpu_usage,
        }
    }
}
