//! Domain layer: snapshots, sub-entities, cutoffs and change records.
//!
//! A [`Snapshot`] is one immutable observation of a host. Sub-entities
//! (databases, PDBs, disk groups) live inside snapshots and are matched
//! across them by name. [`Cutoff`] chooses between the live state and a
//! historical instant.

pub mod change;
pub mod cutoff;
pub mod snapshot;
pub mod snapshot_id;
pub mod sub_entity;

pub use change::{ChangeRecord, SortDirection, SubEntityTrail};
pub use cutoff::Cutoff;
pub use snapshot::{Snapshot, SnapshotHeader};
pub use snapshot_id::SnapshotId;
pub use sub_entity::{SubEntity, SubEntityKind, SubEntityMetrics};
