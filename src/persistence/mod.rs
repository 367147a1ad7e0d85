//! Persistence layer: read access to the append-only snapshot table.
//!
//! [`SnapshotStore`] is the seam between the query pipeline and a backend.
//! It offers exactly the two round-trips a query needs: resolving one
//! snapshot per host, then fetching the history of a batch of hosts.
//! [`PostgresStore`] pushes both into SQL; [`MemoryStore`] runs the pure
//! [`crate::query`] functions over a vector and backs the tests.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::Cutoff;
use crate::error::GatewayError;
use crate::query::SnapshotFilter;

pub use memory::MemoryStore;
pub use models::StoredSnapshot;
pub use postgres::PostgresStore;

/// Parameters of the resolve round-trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveRequest {
    /// Location and environment predicate, applied to the resolved row.
    pub filter: SnapshotFilter,
    /// Live state or a historical instant.
    pub cutoff: Cutoff,
    /// Restricts resolution to a single host.
    pub hostname: Option<String>,
}

/// Upper bound of one host's history: every snapshot with
/// `created_at <= upper` is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryBound {
    /// Host.
    pub hostname: String,
    /// Inclusive upper bound, normally the resolved snapshot's `created_at`.
    pub upper: DateTime<Utc>,
}

/// Read-only access to snapshot rows.
#[async_trait]
pub trait SnapshotStore: Send + Sync + Debug {
    /// Returns at most one row per host: the snapshot representing the host
    /// at `request.cutoff` among those matching `request.filter`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreUnavailable`] on backend failure.
    async fn resolve(&self, request: &ResolveRequest) -> Result<Vec<StoredSnapshot>, GatewayError>;

    /// Returns every row of each bounded host created at or before its bound,
    /// in one round-trip. Row order is unspecified.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreUnavailable`] on backend failure.
    async fn history(&self, bounds: &[HistoryBound])
    -> Result<Vec<StoredSnapshot>, GatewayError>;
}
