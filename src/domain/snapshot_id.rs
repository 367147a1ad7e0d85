//! Identifier of one stored hostdata snapshot row.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Primary key of a snapshot row.
///
/// Unique per snapshot, unlike the hostname which is shared by every
/// snapshot of the same host. Carried into decode diagnostics so a skipped
/// row can be found in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(uuid::Uuid);

impl SnapshotId {
    /// Generates a fresh id for a row ingested by this process.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Wraps the key of a row read back from the store.
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// The row key.
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
