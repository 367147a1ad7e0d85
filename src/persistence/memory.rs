//! In-memory snapshot store.
//!
//! [`MemoryStore`] keeps every row in a `Vec` behind a
//! [`tokio::sync::RwLock`] and answers both round-trips with the pure
//! [`crate::query`] functions, so it resolves exactly like the SQL backend.
//! It also offers the small write path (ingest, dismiss) that tests and
//! demo deployments need to build a history.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{HistoryBound, ResolveRequest, SnapshotStore, StoredSnapshot};
use crate::domain::SnapshotId;
use crate::error::GatewayError;
use crate::query::resolve;

/// Snapshot rows held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<StoredSnapshot>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `rows` as-is.
    #[must_use]
    pub fn from_rows(rows: Vec<StoredSnapshot>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Parses a JSON array of rows.
    ///
    /// # Errors
    ///
    /// Returns the parse error if `raw` is not an array of snapshot rows.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let rows: Vec<StoredSnapshot> = serde_json::from_str(raw)?;
        Ok(Self::from_rows(rows))
    }

    /// Appends a row without touching the others.
    pub async fn insert(&self, row: StoredSnapshot) {
        self.rows.write().await.push(row);
    }

    /// Records a new observation of `hostname`: the previous live row is
    /// archived and the new one becomes live.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if `created_at` is not
    /// later than every existing snapshot of the host.
    pub async fn ingest(
        &self,
        hostname: &str,
        created_at: DateTime<Utc>,
        location: &str,
        environment: &str,
        document: serde_json::Value,
    ) -> Result<SnapshotId, GatewayError> {
        let mut rows = self.rows.write().await;
        let stale = rows
            .iter()
            .filter(|r| r.hostname == hostname)
            .filter_map(|r| r.created_at)
            .any(|t| t >= created_at);
        if stale {
            return Err(GatewayError::InvalidRequest(format!(
                "snapshot of {hostname} at {created_at} is not newer than the stored history"
            )));
        }
        for row in rows.iter_mut().filter(|r| r.hostname == hostname) {
            row.archived = true;
        }
        let row = StoredSnapshot::new(hostname, created_at, location, environment, document);
        let id = row.id;
        rows.push(row);
        tracing::debug!(hostname, %created_at, "snapshot ingested");
        Ok(id)
    }

    /// Retires `hostname`: its current row gets `dismissed_at` and is
    /// archived.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if the host has no live row.
    pub async fn dismiss(&self, hostname: &str, at: DateTime<Utc>) -> Result<(), GatewayError> {
        let mut rows = self.rows.write().await;
        let live = rows
            .iter_mut()
            .find(|r| r.hostname == hostname && r.dismissed_at.is_none() && !r.archived)
            .ok_or_else(|| GatewayError::NotFound(format!("live host {hostname}")))?;
        live.dismissed_at = Some(at);
        live.archived = true;
        Ok(())
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Returns `true` if the store holds no rows.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn resolve(&self, request: &ResolveRequest) -> Result<Vec<StoredSnapshot>, GatewayError> {
        let rows = self.rows.read().await;
        let candidates = rows.iter().filter(|r| {
            request
                .hostname
                .as_deref()
                .is_none_or(|hostname| r.hostname == hostname)
        });
        Ok(resolve(candidates, &request.filter, request.cutoff)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn history(
        &self,
        bounds: &[HistoryBound],
    ) -> Result<Vec<StoredSnapshot>, GatewayError> {
        let upper: HashMap<&str, DateTime<Utc>> = bounds
            .iter()
            .map(|b| (b.hostname.as_str(), b.upper))
            .collect();
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|r| {
                upper
                    .get(r.hostname.as_str())
                    .is_some_and(|bound| r.created_at.is_none_or(|t| t <= *bound))
            })
            .cloned()
            .collect())
    }
}
