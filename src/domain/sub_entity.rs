//! Named objects nested inside a host snapshot.
//!
//! Each kind has an explicit schema. A sub-entity has no storage of its
//! own: it is found again in every historical snapshot of its parent host
//! by name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::GatewayError;

/// Kinds of nested sub-entities that carry a change trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubEntityKind {
    /// Oracle database instance (`features.oracle.databases[]`).
    Database,
    /// Pluggable database, named `<database>/<pdb>`.
    Pdb,
    /// ASM disk group (`features.oracle.diskGroups[]`).
    DiskGroup,
}

impl SubEntityKind {
    /// Every supported kind, in display order.
    pub const ALL: [Self; 3] = [Self::Database, Self::Pdb, Self::DiskGroup];

    /// Canonical path segment / wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Pdb => "pdb",
            Self::DiskGroup => "diskGroup",
        }
    }

    /// Metric names carried by each change record of this kind.
    #[must_use]
    pub const fn metric_names(&self) -> &'static [&'static str] {
        match self {
            Self::Database => &["segmentsSize", "datafileSize", "allocable", "dailyCPUUsage"],
            Self::Pdb => &["segmentsSize", "datafileSize", "allocable"],
            Self::DiskGroup => &["totalSpace", "freeSpace", "usedSpace"],
        }
    }
}

impl fmt::Display for SubEntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubEntityKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "database" | "databases" => Ok(Self::Database),
            "pdb" | "pdbs" => Ok(Self::Pdb),
            "diskgroup" | "diskgroups" | "disk-group" | "disk-groups" => Ok(Self::DiskGroup),
            other => Err(GatewayError::InvalidRequest(format!(
                "unknown sub-entity kind: {other}"
            ))),
        }
    }
}

/// Oracle database instance as reported by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleDatabase {
    /// Instance name; identity within the host.
    pub name: String,
    /// `DB_UNIQUE_NAME`.
    #[serde(default)]
    pub unique_name: String,
    /// Oracle `DBID`, stable across renames and recreations.
    #[serde(default, rename = "dbID")]
    pub db_id: Option<u64>,
    /// Used segment space in GiB.
    #[serde(default)]
    pub segments_size: f64,
    /// Allocated datafile space in GiB.
    #[serde(default)]
    pub datafile_size: f64,
    /// Allocable space in GiB.
    #[serde(default)]
    pub allocable: f64,
    /// Average daily CPU usage, when collected.
    #[serde(default, rename = "dailyCPUUsage")]
    pub daily_cpu_usage: Option<f64>,
    /// Pluggable databases hosted by this container database.
    #[serde(default, deserialize_with = "null_as_default")]
    pub pdbs: Vec<PluggableDatabase>,
}

/// Pluggable database nested inside an [`OracleDatabase`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluggableDatabase {
    /// PDB name; unique within its container database.
    pub name: String,
    /// PDB GUID, stable across recreations when reported.
    #[serde(default)]
    pub guid: Option<String>,
    /// Used segment space in GiB.
    #[serde(default)]
    pub segments_size: f64,
    /// Allocated datafile space in GiB.
    #[serde(default)]
    pub datafile_size: f64,
    /// Allocable space in GiB.
    #[serde(default)]
    pub allocable: f64,
}

/// ASM disk group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskGroup {
    /// Disk group name.
    pub name: String,
    /// Total capacity in GiB.
    #[serde(default)]
    pub total_space: f64,
    /// Free capacity in GiB.
    #[serde(default)]
    pub free_space: f64,
}

/// Borrowed view of one sub-entity inside a snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubEntity<'a> {
    /// A database instance.
    Database(&'a OracleDatabase),
    /// A pluggable database with its container.
    Pdb {
        /// Container database.
        database: &'a OracleDatabase,
        /// The PDB itself.
        pdb: &'a PluggableDatabase,
    },
    /// A disk group.
    DiskGroup(&'a DiskGroup),
}

impl SubEntity<'_> {
    /// Kind of this sub-entity.
    #[must_use]
    pub const fn kind(&self) -> SubEntityKind {
        match self {
            Self::Database(_) => SubEntityKind::Database,
            Self::Pdb { .. } => SubEntityKind::Pdb,
            Self::DiskGroup(_) => SubEntityKind::DiskGroup,
        }
    }

    /// Name used to match this sub-entity across snapshots of its host.
    /// PDBs are qualified by their container: `<database>/<pdb>`.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Database(db) => db.name.clone(),
            Self::Pdb { database, pdb } => qualified_pdb_name(&database.name, &pdb.name),
            Self::DiskGroup(dg) => dg.name.clone(),
        }
    }

    /// Stable identifier reported by the agent, if any.
    #[must_use]
    pub fn stable_id(&self) -> Option<String> {
        match self {
            Self::Database(db) => db.db_id.map(|id| id.to_string()),
            Self::Pdb { pdb, .. } => pdb.guid.clone(),
            Self::DiskGroup(_) => None,
        }
    }

    /// Projects the metrics recorded in a change record.
    #[must_use]
    pub fn metrics(&self) -> SubEntityMetrics {
        match self {
            Self::Database(db) => SubEntityMetrics::Database(DatabaseMetrics {
                segments_size: db.segments_size,
                datafile_size: db.datafile_size,
                allocable: db.allocable,
                daily_cpu_usage: db.daily_cpu_usage,
            }),
            Self::Pdb { pdb, .. } => SubEntityMetrics::Pdb(PdbMetrics {
                segments_size: pdb.segments_size,
                datafile_size: pdb.datafile_size,
                allocable: pdb.allocable,
            }),
            Self::DiskGroup(dg) => SubEntityMetrics::DiskGroup(DiskGroupMetrics {
                total_space: dg.total_space,
                free_space: dg.free_space,
                used_space: dg.total_space - dg.free_space,
            }),
        }
    }
}

/// Deserializes an explicit JSON `null` as `T::default()`; agents send
/// `null` for empty collections.
///
/// # Errors
///
/// Returns the deserializer error for anything that is neither `null` nor
/// a valid `T`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Builds the matching name of a PDB.
#[must_use]
pub fn qualified_pdb_name(database: &str, pdb: &str) -> String {
    format!("{database}/{pdb}")
}

/// Metric values of one sub-entity at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SubEntityMetrics {
    /// Database instance metrics.
    Database(DatabaseMetrics),
    /// Pluggable database metrics.
    Pdb(PdbMetrics),
    /// Disk group metrics.
    DiskGroup(DiskGroupMetrics),
}

/// Database instance metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseMetrics {
    /// Used segment space.
    pub segments_size: f64,
    /// Allocated datafile space.
    pub datafile_size: f64,
    /// Allocable space.
    pub allocable: f64,
    /// Average daily CPU usage.
    #[serde(rename = "dailyCPUUsage")]
    pub daily_cpu_usage: Option<f64>,
}

/// Pluggable database metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdbMetrics {
    /// Used segment space.
    pub segments_size: f64,
    /// Allocated datafile space.
    pub datafile_size: f64,
    /// Allocable space.
    pub allocable: f64,
}

/// Disk group metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskGroupMetrics {
    /// Total capacity.
    pub total_space: f64,
    /// Free capacity.
    pub free_space: f64,
    /// `total_space - free_space`.
    pub used_space: f64,
}
