//! As-of resolution: one snapshot per host for a given cutoff.

use std::collections::BTreeMap;

use super::SnapshotHeader;
use super::filter::SnapshotFilter;
use crate::domain::Cutoff;

/// Returns `true` if `snapshot` is a candidate at `cutoff`.
///
/// `Live` candidates are the current, non-dismissed snapshots. `AsOf`
/// candidates are every snapshot created at or before the cutoff,
/// whatever their flags say today. A snapshot without `created_at` can
/// never be proven older than an `AsOf` cutoff.
pub fn is_candidate<T: SnapshotHeader + ?Sized>(snapshot: &T, cutoff: Cutoff) -> bool {
    match cutoff {
        Cutoff::Live => snapshot.is_live(),
        Cutoff::AsOf(_) => snapshot.created_at().is_some_and(|t| cutoff.admits(t)),
    }
}

/// Resolves the snapshot representing each host at `cutoff`.
///
/// Equivalent to `filter(created_at <= cutoff) -> group by hostname ->
/// keep max(created_at)`, written as a single fold. Location and
/// environment are checked on the winner, so a host that left the
/// selected location is absent rather than shown at an older state.
/// Hosts with no candidate are absent from the result. Output is ordered
/// by hostname.
///
/// `Live` goes through the same fold, so even if the one-live-snapshot
/// invariant is broken at most one snapshot per host comes out.
pub fn resolve<T, I>(snapshots: I, filter: &SnapshotFilter, cutoff: Cutoff) -> Vec<T>
where
    T: SnapshotHeader,
    I: IntoIterator<Item = T>,
{
    let mut latest: BTreeMap<String, T> = BTreeMap::new();
    for snapshot in snapshots {
        if !is_candidate(&snapshot, cutoff) {
            continue;
        }
        let newer = latest
            .get(snapshot.hostname())
            .is_none_or(|current| current.created_at() < snapshot.created_at());
        if newer {
            latest.insert(snapshot.hostname().to_string(), snapshot);
        }
    }
    latest
        .into_values()
        .filter(|snapshot| filter.matches(snapshot))
        .collect()
}

/// Resolves a single host.
pub fn resolve_one<T, I>(
    snapshots: I,
    hostname: &str,
    filter: &SnapshotFilter,
    cutoff: Cutoff,
) -> Option<T>
where
    T: SnapshotHeader,
    I: IntoIterator<Item = T>,
{
    resolve(
        snapshots.into_iter().filter(|s| s.hostname() == hostname),
        filter,
        cutoff,
    )
    .into_iter()
    .next()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::models::StoredSnapshot;
    use crate::query::filter::Locations;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        let Some(t) = Utc.timestamp_opt(secs, 0).single() else {
            panic!("valid timestamp");
        };
        t
    }

    fn snap(host: &str, secs: i64, archived: bool) -> StoredSnapshot {
        let mut s = StoredSnapshot::new(host, at(secs), "Italy", "PRD", json!({}));
        s.archived = archived;
        s
    }

    /// h1 at 10, 20 (live); h2 at 15 (live), dismissed at 30 (archived).
    fn history() -> Vec<StoredSnapshot> {
        let mut dismissed = snap("h3", 5, true);
        dismissed.dismissed_at = Some(at(30));
        vec![
            snap("h1", 10, true),
            snap("h1", 20, false),
            snap("h2", 15, false),
            dismissed,
        ]
    }

    fn created(resolved: &[StoredSnapshot]) -> Vec<(String, i64)> {
        resolved
            .iter()
            .map(|s| (s.hostname.clone(), s.created_at.map_or(-1, |t| t.timestamp())))
            .collect()
    }

    #[test]
    fn live_selects_flagged_current_state() {
        let resolved = resolve(history(), &SnapshotFilter::all(), Cutoff::Live);
        assert_eq!(
            created(&resolved),
            vec![("h1".to_string(), 20), ("h2".to_string(), 15)]
        );
    }

    #[test]
    fn as_of_picks_max_created_at_not_flags() {
        let resolved = resolve(history(), &SnapshotFilter::all(), Cutoff::AsOf(at(12)));
        assert_eq!(
            created(&resolved),
            vec![("h1".to_string(), 10), ("h3".to_string(), 5)]
        );
    }

    #[test]
    fn as_of_is_inclusive() {
        let resolved = resolve(history(), &SnapshotFilter::all(), Cutoff::AsOf(at(20)));
        assert!(created(&resolved).contains(&("h1".to_string(), 20)));
    }

    #[test]
    fn cutoff_before_everything_is_empty() {
        let resolved = resolve(history(), &SnapshotFilter::all(), Cutoff::AsOf(at(1)));
        assert!(resolved.is_empty());
    }

    #[test]
    fn input_order_does_not_matter() {
        let mut reversed = history();
        reversed.reverse();
        let a = resolve(history(), &SnapshotFilter::all(), Cutoff::AsOf(at(25)));
        let b = resolve(reversed, &SnapshotFilter::all(), Cutoff::AsOf(at(25)));
        assert_eq!(created(&a), created(&b));
    }

    #[test]
    fn monotonic_in_cutoff() {
        for (t1, t2) in [(10, 15), (12, 20), (20, 40), (5, 6)] {
            let first = resolve_one(history(), "h1", &SnapshotFilter::all(), Cutoff::AsOf(at(t1)));
            let second = resolve_one(history(), "h1", &SnapshotFilter::all(), Cutoff::AsOf(at(t2)));
            if let Some(first) = first {
                let Some(first_at) = first.created_at else {
                    panic!("resolved snapshot has created_at");
                };
                assert!(first_at <= at(t1));
                let Some(second) = second else {
                    panic!("a later cutoff cannot lose the host");
                };
                assert!(second.created_at >= Some(first_at));
            }
        }
    }

    #[test]
    fn missing_created_at_is_never_an_as_of_candidate() {
        let mut broken = snap("h9", 0, false);
        broken.created_at = None;
        assert!(!is_candidate(&broken, Cutoff::AsOf(at(100))));
        assert!(is_candidate(&broken, Cutoff::Live));
    }

    #[test]
    fn filter_applies_to_the_resolved_state() {
        let mut moved = snap("h1", 30, false);
        moved.location = "Germany".to_string();
        let mut rows = history();
        rows.push(moved);
        let italy = SnapshotFilter::new(Locations::parse("Italy"), "");
        let germany = SnapshotFilter::new(Locations::parse("Germany"), "");

        let resolved = resolve(rows.clone(), &italy, Cutoff::AsOf(at(40)));
        assert!(!created(&resolved).iter().any(|(host, _)| host == "h1"));
        let resolved = resolve(rows.clone(), &germany, Cutoff::AsOf(at(40)));
        assert_eq!(created(&resolved), vec![("h1".to_string(), 30)]);

        // Before the move the host is still in Italy.
        let resolved = resolve(rows, &italy, Cutoff::AsOf(at(25)));
        assert!(created(&resolved).contains(&("h1".to_string(), 20)));
    }

    #[test]
    fn resolve_one_absent_host() {
        assert!(resolve_one(history(), "nope", &SnapshotFilter::all(), Cutoff::Live).is_none());
    }
}
