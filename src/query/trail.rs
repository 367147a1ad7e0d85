//! Change-trail reconstruction.
//!
//! History is fetched once per host (every snapshot up to the resolved
//! one) and every sub-entity's trail is fanned out of that single list.
//!
//! Sub-entities are matched by name. When both the current and a
//! historical sub-entity report a stable id (database `DBID`, PDB GUID)
//! and the ids differ, the historical one is a different object that
//! reused the name and is left out of the trail.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::{
    ChangeRecord, Snapshot, SortDirection, SubEntity, SubEntityKind, SubEntityTrail,
};
use crate::persistence::models::StoredSnapshot;

/// Decoded histories of several hosts, each oldest first.
#[derive(Debug, Clone, Default)]
pub struct HistorySet {
    by_host: HashMap<String, Vec<Snapshot>>,
    skipped: usize,
}

impl HistorySet {
    /// Groups `rows` per host, keeping for each host in `bounds` the
    /// snapshots created at or before its bound.
    ///
    /// Rows with a missing `created_at` or an undecodable document are
    /// skipped and counted; the trail goes on without them.
    pub fn collect<I>(rows: I, bounds: &HashMap<String, DateTime<Utc>>) -> Self
    where
        I: IntoIterator<Item = StoredSnapshot>,
    {
        let mut set = Self::default();
        for row in rows {
            let Some(bound) = bounds.get(&row.hostname) else {
                continue;
            };
            if row.created_at.is_some_and(|t| t > *bound) {
                continue;
            }
            match Snapshot::decode(row) {
                Ok(snapshot) => set
                    .by_host
                    .entry(snapshot.hostname.clone())
                    .or_default()
                    .push(snapshot),
                Err(e) => {
                    set.skipped += 1;
                    tracing::warn!(error = %e, "skipping historical snapshot");
                }
            }
        }
        for history in set.by_host.values_mut() {
            history.sort_by_key(|s| s.created_at);
        }
        set
    }

    /// History of `hostname`, oldest first. Empty when unknown.
    #[must_use]
    pub fn history(&self, hostname: &str) -> &[Snapshot] {
        self.by_host.get(hostname).map_or(&[], Vec::as_slice)
    }

    /// Number of rows skipped while collecting.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Builds the trail of one named sub-entity.
///
/// Returns an empty list when the name never appears in `history`.
#[must_use]
pub fn build_trail(
    current: &Snapshot,
    history: &[Snapshot],
    kind: SubEntityKind,
    name: &str,
    direction: SortDirection,
) -> Vec<ChangeRecord> {
    let anchor = current
        .sub_entity(kind, name)
        .and_then(|entity| entity.stable_id());
    let mut records: Vec<ChangeRecord> = history
        .iter()
        .filter_map(|snapshot| {
            let entity = snapshot.sub_entity(kind, name)?;
            same_lineage(anchor.as_deref(), &entity).then(|| record(snapshot, &entity))
        })
        .collect();
    order(&mut records, direction);
    records
}

/// Builds the trail of every sub-entity of `kind` present in `current`,
/// scanning `history` once.
#[must_use]
pub fn build_all_trails(
    current: &Snapshot,
    history: &[Snapshot],
    kind: SubEntityKind,
    direction: SortDirection,
) -> Vec<SubEntityTrail> {
    let mut targets: Vec<(String, Option<String>, Vec<ChangeRecord>)> = Vec::new();
    for entity in current.sub_entities(kind) {
        let name = entity.name();
        if targets.iter().all(|(existing, _, _)| *existing != name) {
            targets.push((name, entity.stable_id(), Vec::new()));
        }
    }

    for snapshot in history {
        for (name, anchor, records) in &mut targets {
            if let Some(entity) = snapshot.sub_entity(kind, name)
                && same_lineage(anchor.as_deref(), &entity)
            {
                records.push(record(snapshot, &entity));
            }
        }
    }

    targets
        .into_iter()
        .map(|(name, _, mut changes)| {
            order(&mut changes, direction);
            SubEntityTrail {
                hostname: current.hostname.clone(),
                location: current.location.clone(),
                environment: current.environment.clone(),
                created_at: current.created_at,
                kind,
                name,
                changes,
            }
        })
        .collect()
}

fn same_lineage(anchor: Option<&str>, candidate: &SubEntity<'_>) -> bool {
    match (anchor, candidate.stable_id()) {
        (Some(expected), Some(found)) => expected == found,
        _ => true,
    }
}

fn record(snapshot: &Snapshot, entity: &SubEntity<'_>) -> ChangeRecord {
    ChangeRecord {
        updated: snapshot.created_at,
        metrics: entity.metrics(),
    }
}

fn order(records: &mut [ChangeRecord], direction: SortDirection) {
    records.sort_by(|a, b| {
        let ord: Ordering = a.updated.cmp(&b.updated);
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}
