//! PostgreSQL implementation of the snapshot store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::{HistoryBound, ResolveRequest, SnapshotStore, StoredSnapshot};
use crate::config::GatewayConfig;
use crate::domain::{Cutoff, SnapshotId};
use crate::error::GatewayError;

/// One selected `hostdata` row, in column order.
type SnapshotRow = (
    Uuid,
    String,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    bool,
    String,
    String,
    serde_json::Value,
);

const COLUMNS: &str =
    "id, hostname, created_at, dismissed_at, archived, location, environment, document";

/// PostgreSQL-backed snapshot store using `sqlx::PgPool`.
///
/// Live resolution filters on the lifecycle flags. As-of resolution keeps
/// the newest row per host with `DISTINCT ON`. History for a batch of
/// hosts is a single join against `UNNEST` of hostnames and bounds.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreUnavailable`] if the database cannot be
    /// reached.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the bundled migrations.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreUnavailable`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), GatewayError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| GatewayError::StoreUnavailable(format!("migration failed: {e}")))
    }
}

#[async_trait]
impl SnapshotStore for PostgresStore {
    async fn resolve(&self, request: &ResolveRequest) -> Result<Vec<StoredSnapshot>, GatewayError> {
        let as_of = match request.cutoff {
            Cutoff::Live => None,
            Cutoff::AsOf(t) => Some(t),
        };
        // Location and environment are checked on the resolved row only.
        let sql = format!(
            "SELECT {COLUMNS} FROM ( \
               SELECT DISTINCT ON (hostname) {COLUMNS} FROM hostdata \
               WHERE ($3::text IS NULL OR hostname = $3) \
                 AND (($4::timestamptz IS NULL AND archived = FALSE AND dismissed_at IS NULL) \
                   OR created_at <= $4) \
               ORDER BY hostname, created_at DESC NULLS LAST \
             ) AS resolved \
             WHERE ($1::text[] IS NULL OR location = ANY($1)) \
               AND ($2::text IS NULL OR environment = $2) \
             ORDER BY hostname"
        );
        let rows = sqlx::query_as::<_, SnapshotRow>(&sql)
            .bind(request.filter.locations.as_list())
            .bind(request.filter.environment.as_deref())
            .bind(request.hostname.as_deref())
            .bind(as_of)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(from_row).collect())
    }

    async fn history(
        &self,
        bounds: &[HistoryBound],
    ) -> Result<Vec<StoredSnapshot>, GatewayError> {
        if bounds.is_empty() {
            return Ok(Vec::new());
        }
        let hostnames: Vec<String> = bounds.iter().map(|b| b.hostname.clone()).collect();
        let uppers: Vec<DateTime<Utc>> = bounds.iter().map(|b| b.upper).collect();

        let sql = format!(
            "SELECT {} FROM hostdata h \
             JOIN UNNEST($1::text[], $2::timestamptz[]) AS b(hostname, upper) \
               ON h.hostname = b.hostname \
             WHERE h.created_at IS NULL OR h.created_at <= b.upper",
            qualified_columns("h")
        );
        let rows = sqlx::query_as::<_, SnapshotRow>(&sql)
            .bind(hostnames)
            .bind(uppers)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(from_row).collect())
    }
}

fn qualified_columns(alias: &str) -> String {
    COLUMNS
        .split(", ")
        .map(|column| format!("{alias}.{column}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn from_row(
    (id, hostname, created_at, dismissed_at, archived, location, environment, document): SnapshotRow,
) -> StoredSnapshot {
    StoredSnapshot {
        id: SnapshotId::from_uuid(id),
        hostname,
        created_at,
        dismissed_at,
        archived,
        location,
        environment,
        document,
    }
}
