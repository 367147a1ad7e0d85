//! Stored snapshot rows, before decoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::SnapshotId;
use crate::domain::snapshot::SnapshotHeader;

/// A row of the `hostdata` table as returned by any store.
///
/// Only the columns the stores filter on are typed; the nested payload
/// stays a JSON `document` until [`crate::domain::Snapshot`] decodes it, so
/// one malformed document costs one skipped record and not a failed query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSnapshot {
    /// Row identifier.
    pub id: SnapshotId,
    /// Entity key shared by every snapshot of the host.
    pub hostname: String,
    /// Ingestion time. Missing values are a data-integrity problem.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Retirement time of the host, if dismissed.
    #[serde(default)]
    pub dismissed_at: Option<DateTime<Utc>>,
    /// `true` once superseded (or current for a dismissed host).
    #[serde(default)]
    pub archived: bool,
    /// Host location.
    #[serde(default)]
    pub location: String,
    /// Host environment (e.g. `"PRD"`).
    #[serde(default)]
    pub environment: String,
    /// Host info and features payload.
    #[serde(default)]
    pub document: serde_json::Value,
}

impl StoredSnapshot {
    /// Creates a live (non-archived, non-dismissed) row with a fresh id.
    #[must_use]
    pub fn new(
        hostname: impl Into<String>,
        created_at: DateTime<Utc>,
        location: impl Into<String>,
        environment: impl Into<String>,
        document: serde_json::Value,
    ) -> Self {
        Self {
            id: SnapshotId::generate(),
            hostname: hostname.into(),
            created_at: Some(created_at),
            dismissed_at: None,
            archived: false,
            location: location.into(),
            environment: environment.into(),
            document,
        }
    }
}

impl SnapshotHeader for StoredSnapshot {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn dismissed_at(&self) -> Option<DateTime<Utc>> {
        self.dismissed_at
    }

    fn archived(&self) -> bool {
        self.archived
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn environment(&self) -> &str {
        &self.environment
    }
}
