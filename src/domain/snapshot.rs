//! Decoded hostdata snapshot.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SnapshotId;
use super::sub_entity::{
    DiskGroup, OracleDatabase, SubEntity, SubEntityKind, null_as_default, qualified_pdb_name,
};
use crate::error::GatewayError;
use crate::persistence::models::StoredSnapshot;
use crate::query::filter::{SearchField, Searchable};
use crate::query::paging::{SortValue, Sortable};

/// The columns every stage before decoding needs: identity, time axis,
/// lifecycle flags and the location/environment filter attributes.
///
/// Implemented by stored rows and decoded snapshots so the resolver runs
/// unchanged on either.
pub trait SnapshotHeader {
    /// Entity key.
    fn hostname(&self) -> &str;
    /// Ingestion time, if present.
    fn created_at(&self) -> Option<DateTime<Utc>>;
    /// Retirement time, if dismissed.
    fn dismissed_at(&self) -> Option<DateTime<Utc>>;
    /// Superseded flag.
    fn archived(&self) -> bool;
    /// Location attribute.
    fn location(&self) -> &str;
    /// Environment attribute.
    fn environment(&self) -> &str;

    /// `true` for the current state of a host that is still in service.
    fn is_live(&self) -> bool {
        self.dismissed_at().is_none() && !self.archived()
    }
}

impl<T: SnapshotHeader + ?Sized> SnapshotHeader for &T {
    fn hostname(&self) -> &str {
        (**self).hostname()
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        (**self).created_at()
    }

    fn dismissed_at(&self) -> Option<DateTime<Utc>> {
        (**self).dismissed_at()
    }

    fn archived(&self) -> bool {
        (**self).archived()
    }

    fn location(&self) -> &str {
        (**self).location()
    }

    fn environment(&self) -> &str {
        (**self).environment()
    }
}

/// Oracle features of a host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleFeature {
    /// Database instances.
    #[serde(default, deserialize_with = "null_as_default")]
    pub databases: Vec<OracleDatabase>,
    /// ASM disk groups.
    #[serde(default, deserialize_with = "null_as_default")]
    pub disk_groups: Vec<DiskGroup>,
}

/// Technology features of a host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostFeatures {
    /// Oracle feature, empty when the host runs no Oracle software.
    #[serde(default, deserialize_with = "null_as_default")]
    pub oracle: OracleFeature,
}

#[derive(Debug, Deserialize)]
struct HostDocument {
    #[serde(default)]
    info: serde_json::Value,
    #[serde(default, deserialize_with = "null_as_default")]
    features: HostFeatures,
}

/// Position of a sub-entity inside [`HostFeatures`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Database(usize),
    Pdb(usize, usize),
    DiskGroup(usize),
}

/// One immutable observation of a host.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Row identifier.
    pub id: SnapshotId,
    /// Entity key.
    pub hostname: String,
    /// Ingestion time.
    pub created_at: DateTime<Utc>,
    /// Retirement time, if dismissed.
    pub dismissed_at: Option<DateTime<Utc>>,
    /// Superseded flag.
    pub archived: bool,
    /// Location attribute.
    pub location: String,
    /// Environment attribute.
    pub environment: String,
    /// Free-form host information.
    pub info: serde_json::Value,
    /// Technology features holding the sub-entities.
    pub features: HostFeatures,
    /// Sum of the databases' daily CPU usage; missing values count as zero.
    pub total_daily_cpu_usage: f64,
    index: HashMap<(SubEntityKind, String), Slot>,
}

impl Snapshot {
    /// Decodes a stored row.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Decode`] when `created_at` is missing or the
    /// document does not match the host schema.
    pub fn decode(row: StoredSnapshot) -> Result<Self, GatewayError> {
        let id = row.id;
        let created_at = row.created_at.ok_or_else(|| GatewayError::Decode {
            id: id.to_string(),
            reason: "missing createdAt".to_string(),
        })?;
        let document: HostDocument =
            serde_json::from_value(row.document).map_err(|e| GatewayError::Decode {
                id: id.to_string(),
                reason: e.to_string(),
            })?;

        let total_daily_cpu_usage = document
            .features
            .oracle
            .databases
            .iter()
            .map(|db| db.daily_cpu_usage.unwrap_or(0.0))
            .sum();
        let index = build_index(&document.features);

        Ok(Self {
            id,
            hostname: row.hostname,
            created_at,
            dismissed_at: row.dismissed_at,
            archived: row.archived,
            location: row.location,
            environment: row.environment,
            info: document.info,
            features: document.features,
            total_daily_cpu_usage,
            index,
        })
    }

    /// Looks up a sub-entity by kind and matching name.
    #[must_use]
    pub fn sub_entity(&self, kind: SubEntityKind, name: &str) -> Option<SubEntity<'_>> {
        let slot = *self.index.get(&(kind, name.to_string()))?;
        let oracle = &self.features.oracle;
        match slot {
            Slot::Database(i) => oracle.databases.get(i).map(SubEntity::Database),
            Slot::Pdb(i, j) => {
                let database = oracle.databases.get(i)?;
                let pdb = database.pdbs.get(j)?;
                Some(SubEntity::Pdb { database, pdb })
            }
            Slot::DiskGroup(i) => oracle.disk_groups.get(i).map(SubEntity::DiskGroup),
        }
    }

    /// Every sub-entity of `kind`, in document order.
    #[must_use]
    pub fn sub_entities(&self, kind: SubEntityKind) -> Vec<SubEntity<'_>> {
        let oracle = &self.features.oracle;
        match kind {
            SubEntityKind::Database => oracle.databases.iter().map(SubEntity::Database).collect(),
            SubEntityKind::Pdb => oracle
                .databases
                .iter()
                .flat_map(|database| {
                    database
                        .pdbs
                        .iter()
                        .map(move |pdb| SubEntity::Pdb { database, pdb })
                })
                .collect(),
            SubEntityKind::DiskGroup => {
                oracle.disk_groups.iter().map(SubEntity::DiskGroup).collect()
            }
        }
    }
}

impl TryFrom<StoredSnapshot> for Snapshot {
    type Error = GatewayError;

    fn try_from(row: StoredSnapshot) -> Result<Self, Self::Error> {
        Self::decode(row)
    }
}

/// Builds the name lookup once per snapshot. The first occurrence of a
/// duplicated name wins.
fn build_index(features: &HostFeatures) -> HashMap<(SubEntityKind, String), Slot> {
    let mut index = HashMap::new();
    for (i, db) in features.oracle.databases.iter().enumerate() {
        index
            .entry((SubEntityKind::Database, db.name.clone()))
            .or_insert(Slot::Database(i));
        for (j, pdb) in db.pdbs.iter().enumerate() {
            index
                .entry((SubEntityKind::Pdb, qualified_pdb_name(&db.name, &pdb.name)))
                .or_insert(Slot::Pdb(i, j));
        }
    }
    for (i, dg) in features.oracle.disk_groups.iter().enumerate() {
        index
            .entry((SubEntityKind::DiskGroup, dg.name.clone()))
            .or_insert(Slot::DiskGroup(i));
    }
    index
}

impl SnapshotHeader for Snapshot {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
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

impl Searchable for Snapshot {
    fn search_values(&self, field: SearchField) -> Vec<&str> {
        let oracle = &self.features.oracle;
        match field {
            SearchField::Hostname => vec![self.hostname.as_str()],
            SearchField::Location => vec![self.location.as_str()],
            SearchField::Environment => vec![self.environment.as_str()],
            SearchField::DatabaseName => oracle.databases.iter().map(|db| db.name.as_str()).collect(),
            SearchField::PdbName => oracle
                .databases
                .iter()
                .flat_map(|db| db.pdbs.iter().map(|pdb| pdb.name.as_str()))
                .collect(),
            SearchField::DiskGroupName => {
                oracle.disk_groups.iter().map(|dg| dg.name.as_str()).collect()
            }
            SearchField::SubEntityName => {
                let mut values = self.search_values(SearchField::DatabaseName);
                values.extend(self.search_values(SearchField::PdbName));
                values.extend(self.search_values(SearchField::DiskGroupName));
                values
            }
        }
    }
}

impl Sortable for Snapshot {
    fn sort_value(&self, field: &str) -> Option<SortValue<'_>> {
        match field {
            "hostname" => Some(SortValue::Text(&self.hostname)),
            "location" => Some(SortValue::Text(&self.location)),
            "environment" => Some(SortValue::Text(&self.environment)),
            "createdAt" => Some(SortValue::Time(self.created_at)),
            "totalDailyCPUUsage" => Some(SortValue::Number(self.total_daily_cpu_usage)),
            "databaseCount" => {
                #[allow(clippy::cast_precision_loss)]
                let count = self.features.oracle.databases.len() as f64;
                Some(SortValue::Number(count))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        let Some(t) = Utc.timestamp_opt(secs, 0).single() else {
            panic!("valid timestamp");
        };
        t
    }

    fn row(document: serde_json::Value) -> StoredSnapshot {
        StoredSnapshot::new("test-db", at(10), "Italy", "PRD", document)
    }

    fn decoded(document: serde_json::Value) -> Snapshot {
        let Ok(snapshot) = Snapshot::decode(row(document)) else {
            panic!("fixture must decode");
        };
        snapshot
    }

    fn sample_document() -> serde_json::Value {
        json!({
            "info": { "os": "Linux" },
            "features": { "oracle": {
                "databases": [
                    { "name": "SALES", "segmentsSize": 3, "dailyCPUUsage": 0.5,
                      "pdbs": [ { "name": "PDB1", "segmentsSize": 1 } ] },
                    { "name": "ORCL", "segmentsSize": 7, "dailyCPUUsage": 1.5 },
                    { "name": "SALES", "segmentsSize": 99 }
                ],
                "diskGroups": [ { "name": "DATA", "totalSpace": 10, "freeSpace": 4 } ]
            } }
        })
    }

    #[test]
    fn decode_computes_total_daily_cpu_usage() {
        let snapshot = decoded(sample_document());
        assert!((snapshot.total_daily_cpu_usage - 2.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.info.get("os").and_then(|v| v.as_str()), Some("Linux"));
    }

    #[test]
    fn decode_rejects_missing_created_at() {
        let mut raw = row(sample_document());
        raw.created_at = None;
        assert!(matches!(Snapshot::decode(raw), Err(GatewayError::Decode { .. })));
    }

    #[test]
    fn decode_rejects_malformed_document() {
        let raw = row(json!({ "features": { "oracle": { "databases": "none" } } }));
        assert!(matches!(Snapshot::decode(raw), Err(GatewayError::Decode { .. })));
    }

    #[test]
    fn decode_accepts_null_and_missing_features() {
        let snapshot = decoded(json!({ "features": { "oracle": null } }));
        assert!(snapshot.sub_entities(SubEntityKind::Database).is_empty());
        let snapshot = decoded(json!({}));
        assert!(snapshot.sub_entities(SubEntityKind::DiskGroup).is_empty());
    }

    #[test]
    fn lookup_by_name_first_occurrence_wins() {
        let snapshot = decoded(sample_document());
        let Some(SubEntity::Database(db)) = snapshot.sub_entity(SubEntityKind::Database, "SALES")
        else {
            panic!("SALES present");
        };
        assert!((db.segments_size - 3.0).abs() < f64::EPSILON);
        assert!(snapshot.sub_entity(SubEntityKind::Database, "MISSING").is_none());
    }

    #[test]
    fn lookup_pdb_and_disk_group() {
        let snapshot = decoded(sample_document());
        assert!(snapshot.sub_entity(SubEntityKind::Pdb, "SALES/PDB1").is_some());
        assert!(snapshot.sub_entity(SubEntityKind::Pdb, "PDB1").is_none());
        assert!(snapshot.sub_entity(SubEntityKind::DiskGroup, "DATA").is_some());
        assert_eq!(snapshot.sub_entities(SubEntityKind::Database).len(), 3);
        assert_eq!(snapshot.sub_entities(SubEntityKind::Pdb).len(), 1);
    }

    #[test]
    fn search_values_cover_nested_names() {
        let snapshot = decoded(sample_document());
        assert_eq!(
            snapshot.search_values(SearchField::DatabaseName),
            vec!["SALES", "ORCL", "SALES"]
        );
        assert_eq!(snapshot.search_values(SearchField::PdbName), vec!["PDB1"]);
        assert_eq!(snapshot.search_values(SearchField::SubEntityName).len(), 5);
    }

    #[test]
    fn unknown_sort_field_is_none() {
        let snapshot = decoded(sample_document());
        assert!(snapshot.sort_value("hostname").is_some());
        assert!(snapshot.sort_value("nope").is_none());
    }
}
