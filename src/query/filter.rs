//! Filter predicates shared by every read path.
//!
//! [`SnapshotFilter`] selects snapshots by location and environment and is
//! cheap enough to push into the store. [`KeywordSearch`] runs on resolved
//! records: every keyword must match some configured field.

use std::collections::BTreeSet;
use std::str::FromStr;

use super::SnapshotHeader;
use crate::error::GatewayError;

/// Location selector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Locations {
    /// No location restriction.
    #[default]
    All,
    /// Only the listed locations.
    Only(BTreeSet<String>),
}

impl Locations {
    /// Parses a comma separated list. Empty input or `ALL` selects every
    /// location.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("ALL") {
            return Self::All;
        }
        let set: BTreeSet<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if set.is_empty() { Self::All } else { Self::Only(set) }
    }

    /// Returns `true` if `location` is selected.
    #[must_use]
    pub fn contains(&self, location: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(location),
        }
    }

    /// The selected locations, `None` meaning all.
    #[must_use]
    pub fn as_list(&self) -> Option<Vec<String>> {
        match self {
            Self::All => None,
            Self::Only(set) => Some(set.iter().cloned().collect()),
        }
    }
}

/// Location and environment predicate on snapshot attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SnapshotFilter {
    /// Location selector.
    pub locations: Locations,
    /// Exact environment, `None` meaning any.
    pub environment: Option<String>,
}

impl SnapshotFilter {
    /// Filter that accepts everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Builds a filter; an empty `environment` means any environment.
    #[must_use]
    pub fn new(locations: Locations, environment: &str) -> Self {
        let environment = environment.trim();
        Self {
            locations,
            environment: (!environment.is_empty()).then(|| environment.to_string()),
        }
    }

    /// Evaluates the predicate.
    pub fn matches<T: SnapshotHeader + ?Sized>(&self, snapshot: &T) -> bool {
        self.locations.contains(snapshot.location())
            && self
                .environment
                .as_deref()
                .is_none_or(|env| env == snapshot.environment())
    }
}

/// Text fields keyword search can look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchField {
    /// Host name.
    Hostname,
    /// Host location.
    Location,
    /// Host environment.
    Environment,
    /// Every database instance name.
    DatabaseName,
    /// Every PDB name (unqualified).
    PdbName,
    /// Every disk group name.
    DiskGroupName,
    /// Matching names of every sub-entity.
    SubEntityName,
}

impl SearchField {
    /// Default fields for host listings.
    pub const HOST_DEFAULTS: &'static [Self] = &[
        Self::Hostname,
        Self::DatabaseName,
        Self::PdbName,
        Self::DiskGroupName,
    ];

    /// Default fields for change-trail listings.
    pub const TRAIL_DEFAULTS: &'static [Self] = &[Self::Hostname, Self::SubEntityName];

    /// Parses a comma separated field list, e.g. `hostname,databaseName`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] naming the first unknown
    /// field.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, GatewayError> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for SearchField {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hostname" => Ok(Self::Hostname),
            "location" => Ok(Self::Location),
            "environment" => Ok(Self::Environment),
            "databaseName" => Ok(Self::DatabaseName),
            "pdbName" => Ok(Self::PdbName),
            "diskGroupName" => Ok(Self::DiskGroupName),
            "subEntityName" => Ok(Self::SubEntityName),
            other => Err(GatewayError::InvalidRequest(format!(
                "unknown search field: {other}"
            ))),
        }
    }
}

/// Records keyword search can run on.
pub trait Searchable {
    /// All values of `field` on this record; multi-valued fields return
    /// one entry per nested object.
    fn search_values(&self, field: SearchField) -> Vec<&str>;
}

/// Case-insensitive keyword predicate: AND across keywords, OR across
/// fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeywordSearch {
    keywords: Vec<String>,
}

impl KeywordSearch {
    /// Builds a search from keywords. Blank keywords are dropped, so
    /// `[""]` matches everything.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Splits a whitespace separated `search` parameter.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split_whitespace())
    }

    /// Returns `true` when there are no keywords.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Evaluates the predicate against `fields` of `record`.
    pub fn matches<R: Searchable + ?Sized>(&self, record: &R, fields: &[SearchField]) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let values: Vec<String> = fields
            .iter()
            .flat_map(|field| record.search_values(*field))
            .map(str::to_lowercase)
            .collect();
        self.keywords
            .iter()
            .all(|keyword| values.iter().any(|value| value.contains(keyword.as_str())))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    struct Row {
        hostname: &'static str,
        databases: Vec<&'static str>,
    }

    impl Searchable for Row {
        fn search_values(&self, field: SearchField) -> Vec<&str> {
            match field {
                SearchField::Hostname => vec![self.hostname],
                SearchField::DatabaseName => self.databases.clone(),
                _ => Vec::new(),
            }
        }
    }

    const FIELDS: &[SearchField] = &[SearchField::Hostname, SearchField::DatabaseName];

    #[test]
    fn locations_parse_all_and_lists() {
        assert_eq!(Locations::parse(""), Locations::All);
        assert_eq!(Locations::parse("ALL"), Locations::All);
        assert_eq!(Locations::parse("all"), Locations::All);
        let parsed = Locations::parse("Italy, Germany,");
        assert!(parsed.contains("Italy"));
        assert!(parsed.contains("Germany"));
        assert!(!parsed.contains("France"));
        assert_eq!(
            parsed.as_list(),
            Some(vec!["Germany".to_string(), "Italy".to_string()])
        );
    }

    #[test]
    fn empty_environment_matches_any() {
        let filter = SnapshotFilter::new(Locations::All, "  ");
        assert_eq!(filter.environment, None);
    }

    #[test]
    fn keywords_and_across_keywords_or_across_fields() {
        let search = KeywordSearch::new(["h1", "X"]);
        let both_in_different_fields = Row {
            hostname: "h1",
            databases: vec!["X"],
        };
        let only_host = Row {
            hostname: "h1",
            databases: vec!["Y"],
        };
        let only_db = Row {
            hostname: "h2",
            databases: vec!["X"],
        };
        assert!(search.matches(&both_in_different_fields, FIELDS));
        assert!(!search.matches(&only_host, FIELDS));
        assert!(!search.matches(&only_db, FIELDS));
    }

    #[test]
    fn keywords_are_case_insensitive_substrings() {
        let search = KeywordSearch::parse("TEST sale");
        let row = Row {
            hostname: "my-test-db",
            databases: vec!["SALES"],
        };
        assert!(search.matches(&row, FIELDS));
    }

    #[test]
    fn keywords_ignore_unconfigured_fields() {
        let search = KeywordSearch::new(["X"]);
        let row = Row {
            hostname: "h1",
            databases: vec!["X"],
        };
        assert!(!search.matches(&row, &[SearchField::Hostname]));
    }

    #[test]
    fn search_fields_parse_from_lists() {
        let Ok(fields) = SearchField::parse_list("hostname, pdbName,") else {
            panic!("valid list");
        };
        assert_eq!(fields, vec![SearchField::Hostname, SearchField::PdbName]);
        assert!(SearchField::parse_list("hostname,ram").is_err());
    }

    #[test]
    fn empty_keywords_always_match() {
        let row = Row {
            hostname: "h1",
            databases: Vec::new(),
        };
        assert!(KeywordSearch::new(Vec::<String>::new()).matches(&row, FIELDS));
        assert!(KeywordSearch::new([""]).matches(&row, FIELDS));
        assert!(KeywordSearch::parse("   ").is_empty());
    }
}
