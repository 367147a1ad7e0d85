//! History service: the four read operations over a [`SnapshotStore`].
//!
//! Every operation is at most two store round-trips: resolve, then one
//! batched history lookup. The store applies location and environment to
//! the resolved row; keyword search and paging run after the final
//! resolved or joined set.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::domain::{Cutoff, Snapshot, SortDirection, SubEntityKind, SubEntityTrail};
use crate::error::GatewayError;
use crate::persistence::{HistoryBound, ResolveRequest, SnapshotStore, StoredSnapshot};
use crate::query::{
    HistorySet, KeywordSearch, PageRequest, Pagination, SearchField, SnapshotFilter,
    build_all_trails, build_trail, paginate, sort_items,
};

/// Parameters shared by the list operations.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Location and environment predicate.
    pub filter: SnapshotFilter,
    /// Keywords that must all match.
    pub search: KeywordSearch,
    /// Fields searched by `search`; empty means the operation's defaults.
    pub search_fields: Vec<SearchField>,
    /// Resolution instant.
    pub cutoff: Cutoff,
    /// Sort field; empty or unknown keeps the resolved order.
    pub sort_by: String,
    /// Reverse the sort.
    pub sort_desc: bool,
    /// Requested page.
    pub page: PageRequest,
}

impl ListQuery {
    fn fields<'a>(&'a self, defaults: &'a [SearchField]) -> &'a [SearchField] {
        if self.search_fields.is_empty() {
            defaults
        } else {
            &self.search_fields
        }
    }
}

/// A result plus the number of stored records skipped because they could
/// not be decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    /// The result.
    pub value: T,
    /// Records left out of `value`.
    pub skipped: usize,
}

/// Orchestration layer for the read operations.
///
/// Stateless coordinator: owns a shared [`SnapshotStore`] and the deadline
/// applied to each round-trip. A deadline overrun is an error, never an
/// empty result.
#[derive(Debug, Clone)]
pub struct HistoryService {
    store: Arc<dyn SnapshotStore>,
    store_timeout: Duration,
}

impl HistoryService {
    /// Creates a new `HistoryService`.
    #[must_use]
    pub fn new(store: Arc<dyn SnapshotStore>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    /// Returns a reference to the inner store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Resolves one host at `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if no snapshot of the host
    /// satisfies `filter` at `cutoff`, [`GatewayError::Decode`] if the
    /// resolved snapshot cannot be decoded, or a store error.
    pub async fn get_one_as_of(
        &self,
        hostname: &str,
        filter: &SnapshotFilter,
        cutoff: Cutoff,
    ) -> Result<Snapshot, GatewayError> {
        let request = ResolveRequest {
            filter: filter.clone(),
            cutoff,
            hostname: Some(hostname.to_string()),
        };
        let rows = self.timed(self.store.resolve(&request)).await?;
        let row = rows
            .into_iter()
            .find(|r| r.hostname == hostname)
            .ok_or_else(|| GatewayError::NotFound(format!("host {hostname} at {cutoff}")))?;
        Snapshot::decode(row)
    }

    /// Resolves every host matching `query` at its cutoff, then searches,
    /// sorts and pages the result.
    ///
    /// # Errors
    ///
    /// Returns a store error. Undecodable snapshots are skipped.
    pub async fn list_as_of(
        &self,
        query: &ListQuery,
    ) -> Result<Outcome<Pagination<Snapshot>>, GatewayError> {
        let started = Instant::now();
        let (mut snapshots, skipped) = self.resolve_all(query).await?;
        let fields = query.fields(SearchField::HOST_DEFAULTS);
        snapshots.retain(|s| query.search.matches(s, fields));
        sort_items(&mut snapshots, &query.sort_by, query.sort_desc);
        let page = paginate(snapshots, query.page);

        tracing::debug!(
            cutoff = %query.cutoff,
            total = page.total_elements,
            skipped,
            elapsed_ms = elapsed_ms(started),
            "list_as_of"
        );
        Ok(Outcome {
            value: page,
            skipped,
        })
    }

    /// Builds the change trail of one sub-entity of one host.
    ///
    /// The host is resolved at `cutoff` first; the trail covers every
    /// snapshot up to and including the resolved one. A name that never
    /// appears yields an empty trail.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if the host does not resolve,
    /// [`GatewayError::Decode`] if its resolved snapshot cannot be decoded,
    /// or a store error.
    pub async fn get_trail(
        &self,
        hostname: &str,
        kind: SubEntityKind,
        name: &str,
        filter: &SnapshotFilter,
        cutoff: Cutoff,
        direction: SortDirection,
    ) -> Result<Outcome<SubEntityTrail>, GatewayError> {
        let started = Instant::now();
        let current = self.get_one_as_of(hostname, filter, cutoff).await?;
        let history = self.history_of(std::slice::from_ref(&current)).await?;
        let changes = build_trail(
            &current,
            history.history(&current.hostname),
            kind,
            name,
            direction,
        );

        tracing::debug!(
            hostname,
            %kind,
            name,
            records = changes.len(),
            skipped = history.skipped(),
            elapsed_ms = elapsed_ms(started),
            "get_trail"
        );
        Ok(Outcome {
            value: SubEntityTrail {
                hostname: current.hostname,
                location: current.location,
                environment: current.environment,
                created_at: current.created_at,
                kind,
                name: name.to_string(),
                changes,
            },
            skipped: history.skipped(),
        })
    }

    /// Builds the trails of every sub-entity of `kind` across every host
    /// matching `query`, then searches, sorts and pages the flattened rows
    /// (one per host and sub-entity).
    ///
    /// # Errors
    ///
    /// Returns a store error. Undecodable snapshots are skipped.
    pub async fn list_all_trails(
        &self,
        query: &ListQuery,
        kind: SubEntityKind,
        direction: SortDirection,
    ) -> Result<Outcome<Pagination<SubEntityTrail>>, GatewayError> {
        let started = Instant::now();
        let (snapshots, resolve_skipped) = self.resolve_all(query).await?;
        let history = self.history_of(&snapshots).await?;

        let fields = query.fields(SearchField::TRAIL_DEFAULTS);
        let mut trails: Vec<SubEntityTrail> = snapshots
            .iter()
            .flat_map(|s| build_all_trails(s, history.history(&s.hostname), kind, direction))
            .filter(|t| query.search.matches(t, fields))
            .collect();
        sort_items(&mut trails, &query.sort_by, query.sort_desc);
        let page = paginate(trails, query.page);
        let skipped = resolve_skipped + history.skipped();

        tracing::debug!(
            %kind,
            cutoff = %query.cutoff,
            hosts = snapshots.len(),
            total = page.total_elements,
            skipped,
            elapsed_ms = elapsed_ms(started),
            "list_all_trails"
        );
        Ok(Outcome {
            value: page,
            skipped,
        })
    }

    /// Resolves and decodes every host matching `query`, skipping rows that
    /// fail to decode.
    async fn resolve_all(&self, query: &ListQuery) -> Result<(Vec<Snapshot>, usize), GatewayError> {
        let request = ResolveRequest {
            filter: query.filter.clone(),
            cutoff: query.cutoff,
            hostname: None,
        };
        let rows = self.timed(self.store.resolve(&request)).await?;
        Ok(decode_all(rows))
    }

    /// Fetches the histories of `snapshots` in one round-trip, each bounded
    /// by the snapshot's own `created_at`.
    async fn history_of(&self, snapshots: &[Snapshot]) -> Result<HistorySet, GatewayError> {
        if snapshots.is_empty() {
            return Ok(HistorySet::default());
        }
        let bounds: Vec<HistoryBound> = snapshots
            .iter()
            .map(|s| HistoryBound {
                hostname: s.hostname.clone(),
                upper: s.created_at,
            })
            .collect();
        let rows = self.timed(self.store.history(&bounds)).await?;
        let upper: HashMap<String, _> = bounds.into_iter().map(|b| (b.hostname, b.upper)).collect();
        Ok(HistorySet::collect(rows, &upper))
    }

    async fn timed<T, F>(&self, round_trip: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        tokio::time::timeout(self.store_timeout, round_trip)
            .await
            .map_err(|_| {
                let timeout_ms = u64::try_from(self.store_timeout.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(timeout_ms, "store round-trip timed out");
                GatewayError::StoreTimeout { timeout_ms }
            })?
    }
}

fn decode_all(rows: Vec<StoredSnapshot>) -> (Vec<Snapshot>, usize) {
    let mut skipped = 0;
    let snapshots = rows
        .into_iter()
        .filter_map(|row| match Snapshot::decode(row) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                skipped += 1;
                tracing::warn!(error = %e, "skipping resolved snapshot");
                None
            }
        })
        .collect();
    (snapshots, skipped)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::SubEntityMetrics;
    use crate::persistence::MemoryStore;
    use crate::query::Locations;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        let Some(t) = Utc.timestamp_opt(secs, 0).single() else {
            panic!("valid timestamp");
        };
        t
    }

    fn databases(dbs: serde_json::Value) -> serde_json::Value {
        json!({ "features": { "oracle": { "databases": dbs } } })
    }

    /// h1 at 10 (X=3) and 20 (X=5, Y new); h2 in Germany at 30.
    async fn scenario_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let inserts = [
            ("h1", 10, "Italy", databases(json!([{ "name": "X", "segmentsSize": 3 }]))),
            (
                "h1",
                20,
                "Italy",
                databases(json!([
                    { "name": "X", "segmentsSize": 5 },
                    { "name": "Y", "segmentsSize": 1 }
                ])),
            ),
            ("h2", 30, "Germany", databases(json!([{ "name": "Z" }]))),
        ];
        for (host, secs, location, document) in inserts {
            let Ok(_) = store.ingest(host, at(secs), location, "PRD", document).await else {
                panic!("ingest {host}");
            };
        }
        store
    }

    fn service(store: Arc<MemoryStore>) -> HistoryService {
        HistoryService::new(store, Duration::from_secs(5))
    }

    fn as_of(secs: i64) -> ListQuery {
        ListQuery {
            cutoff: Cutoff::AsOf(at(secs)),
            ..ListQuery::default()
        }
    }

    fn hosts(page: &Pagination<Snapshot>) -> Vec<(String, i64)> {
        page.content
            .iter()
            .map(|s| (s.hostname.clone(), s.created_at.timestamp()))
            .collect()
    }

    #[tokio::test]
    async fn scenario_a_list_as_of_before_second_snapshot() {
        let svc = service(scenario_store().await);
        let Ok(outcome) = svc.list_as_of(&as_of(15)).await else {
            panic!("list_as_of");
        };
        assert_eq!(hosts(&outcome.value), vec![("h1".to_string(), 10)]);
        assert_eq!(outcome.skipped, 0);
    }

    #[tokio::test]
    async fn scenario_a_trail_of_x() {
        let svc = service(scenario_store().await);
        let Ok(outcome) = svc
            .get_trail(
                "h1",
                SubEntityKind::Database,
                "X",
                &SnapshotFilter::all(),
                Cutoff::AsOf(at(25)),
                SortDirection::Ascending,
            )
            .await
        else {
            panic!("get_trail");
        };
        let points: Vec<(i64, f64)> = outcome
            .value
            .changes
            .iter()
            .map(|c| match &c.metrics {
                SubEntityMetrics::Database(m) => (c.updated.timestamp(), m.segments_size),
                other => panic!("unexpected metrics {other:?}"),
            })
            .collect();
        assert_eq!(points, vec![(10, 3.0), (20, 5.0)]);
    }

    #[tokio::test]
    async fn scenario_b_early_cutoff_drops_host() {
        let svc = service(scenario_store().await);
        let Ok(early) = svc.list_as_of(&as_of(5)).await else {
            panic!("list_as_of");
        };
        assert!(early.value.content.is_empty());

        let Ok(mid) = svc.list_as_of(&as_of(25)).await else {
            panic!("list_as_of");
        };
        assert_eq!(hosts(&mid.value), vec![("h1".to_string(), 20)]);
    }

    #[tokio::test]
    async fn as_of_is_idempotent() {
        let svc = service(scenario_store().await);
        let first = svc.list_as_of(&as_of(25)).await.ok().map(|o| o.value);
        let second = svc.list_as_of(&as_of(25)).await.ok().map(|o| o.value);
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn live_list_filters_by_location() {
        let svc = service(scenario_store().await);
        let query = ListQuery {
            filter: SnapshotFilter::new(Locations::parse("Germany"), ""),
            ..ListQuery::default()
        };
        let Ok(outcome) = svc.list_as_of(&query).await else {
            panic!("list_as_of");
        };
        assert_eq!(hosts(&outcome.value), vec![("h2".to_string(), 30)]);
    }

    #[tokio::test]
    async fn moved_host_is_filtered_on_its_state_at_the_cutoff() {
        let store = Arc::new(MemoryStore::new());
        for (secs, location) in [(10, "Italy"), (20, "Germany")] {
            let Ok(_) = store.ingest("h1", at(secs), location, "PRD", databases(json!([]))).await
            else {
                panic!("ingest h1@{secs}");
            };
        }
        let svc = service(store);
        let italy = SnapshotFilter::new(Locations::parse("Italy"), "");

        for cutoff in [Cutoff::Live, Cutoff::AsOf(at(25))] {
            let result = svc.get_one_as_of("h1", &italy, cutoff).await;
            assert!(matches!(result, Err(GatewayError::NotFound(_))));
        }

        let Ok(before) = svc.get_one_as_of("h1", &italy, Cutoff::AsOf(at(15))).await else {
            panic!("h1 was in Italy at 15");
        };
        assert_eq!(before.created_at, at(10));

        let query = ListQuery {
            filter: italy,
            cutoff: Cutoff::AsOf(at(25)),
            ..ListQuery::default()
        };
        let Ok(outcome) = svc.list_as_of(&query).await else {
            panic!("list_as_of");
        };
        assert!(outcome.value.content.is_empty());
    }

    #[tokio::test]
    async fn list_search_sort_and_page() {
        let svc = service(scenario_store().await);
        let query = ListQuery {
            sort_by: "hostname".to_string(),
            sort_desc: true,
            page: PageRequest::new(0, 1),
            ..ListQuery::default()
        };
        let Ok(outcome) = svc.list_as_of(&query).await else {
            panic!("list_as_of");
        };
        assert_eq!(hosts(&outcome.value), vec![("h2".to_string(), 30)]);
        assert_eq!(outcome.value.total_pages, 2);

        let query = ListQuery {
            search: KeywordSearch::parse("y"),
            ..ListQuery::default()
        };
        let Ok(outcome) = svc.list_as_of(&query).await else {
            panic!("list_as_of");
        };
        assert_eq!(hosts(&outcome.value), vec![("h1".to_string(), 20)]);
    }

    #[tokio::test]
    async fn get_one_not_found_is_an_error() {
        let svc = service(scenario_store().await);
        let missing = svc
            .get_one_as_of("nope", &SnapshotFilter::all(), Cutoff::Live)
            .await;
        assert!(matches!(missing, Err(GatewayError::NotFound(_))));

        let too_early = svc
            .get_one_as_of("h1", &SnapshotFilter::all(), Cutoff::AsOf(at(1)))
            .await;
        assert!(matches!(too_early, Err(GatewayError::NotFound(_))));

        let filtered = svc
            .get_one_as_of(
                "h1",
                &SnapshotFilter::new(Locations::parse("Germany"), ""),
                Cutoff::Live,
            )
            .await;
        assert!(matches!(filtered, Err(GatewayError::NotFound(_))));
    }

    #[tokio::test]
    async fn undecodable_snapshot_fails_lookup_but_is_skipped_in_lists() {
        let store = scenario_store().await;
        let Ok(_) = store
            .ingest("h3", at(40), "Italy", "PRD", json!({ "features": 7 }))
            .await
        else {
            panic!("ingest h3");
        };
        let svc = service(store);

        let one = svc.get_one_as_of("h3", &SnapshotFilter::all(), Cutoff::Live).await;
        assert!(matches!(one, Err(GatewayError::Decode { .. })));

        let Ok(list) = svc.list_as_of(&ListQuery::default()).await else {
            panic!("list_as_of");
        };
        assert_eq!(list.skipped, 1);
        assert_eq!(list.value.total_elements, 2);
    }

    #[tokio::test]
    async fn trail_counts_skipped_history() {
        let store = scenario_store().await;
        let mut broken = StoredSnapshot::new("h1", at(5), "Italy", "PRD", json!({ "features": 7 }));
        broken.archived = true;
        store.insert(broken).await;
        let svc = service(store);
        let Ok(outcome) = svc
            .get_trail(
                "h1",
                SubEntityKind::Database,
                "X",
                &SnapshotFilter::all(),
                Cutoff::Live,
                SortDirection::Descending,
            )
            .await
        else {
            panic!("get_trail");
        };
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.value.changes.len(), 2);
        let first = outcome.value.changes.first().map(|c| c.updated.timestamp());
        assert_eq!(first, Some(20));
    }

    #[tokio::test]
    async fn list_all_trails_flattens_hosts_and_sub_entities() {
        let svc = service(scenario_store().await);
        let Ok(outcome) = svc
            .list_all_trails(
                &ListQuery::default(),
                SubEntityKind::Database,
                SortDirection::Ascending,
            )
            .await
        else {
            panic!("list_all_trails");
        };
        let rows: Vec<(String, String, usize)> = outcome
            .value
            .content
            .iter()
            .map(|t| (t.hostname.clone(), t.name.clone(), t.changes.len()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("h1".to_string(), "X".to_string(), 2),
                ("h1".to_string(), "Y".to_string(), 1),
                ("h2".to_string(), "Z".to_string(), 1),
            ]
        );

        let query = ListQuery {
            search: KeywordSearch::new(["h1", "y"]),
            ..ListQuery::default()
        };
        let Ok(searched) = svc
            .list_all_trails(&query, SubEntityKind::Database, SortDirection::Ascending)
            .await
        else {
            panic!("list_all_trails");
        };
        assert_eq!(searched.value.total_elements, 1);
    }

    #[derive(Debug)]
    struct StalledStore;

    #[async_trait]
    impl SnapshotStore for StalledStore {
        async fn resolve(
            &self,
            _request: &ResolveRequest,
        ) -> Result<Vec<StoredSnapshot>, GatewayError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }

        async fn history(
            &self,
            _bounds: &[HistoryBound],
        ) -> Result<Vec<StoredSnapshot>, GatewayError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn store_timeout_is_an_error_not_an_empty_list() {
        let svc = HistoryService::new(Arc::new(StalledStore), Duration::from_millis(10));
        let result = svc.list_as_of(&ListQuery::default()).await;
        assert!(matches!(
            result,
            Err(GatewayError::StoreTimeout { timeout_ms: 10 })
        ));
    }
}
