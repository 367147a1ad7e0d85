//! The instant a read is resolved against.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::GatewayError;

/// Instant used for as-of resolution.
///
/// `Live` selects the current state through the `archived` and
/// `dismissed_at` flags. `AsOf` ignores both flags and selects by
/// `created_at <= t`, since the flags describe the present and not the
/// state at `t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cutoff {
    /// Current, non-archived, non-dismissed state.
    #[default]
    Live,
    /// State as observed at the given instant (inclusive).
    AsOf(DateTime<Utc>),
}

impl Cutoff {
    /// Returns `true` if a snapshot created at `created_at` may be visible
    /// at this cutoff. `Live` admits every creation time.
    #[must_use]
    pub fn admits(&self, created_at: DateTime<Utc>) -> bool {
        match self {
            Self::Live => true,
            Self::AsOf(cutoff) => created_at <= *cutoff,
        }
    }

    /// Parses an optional `older-than` query value. Missing, empty or
    /// `"now"` mean [`Cutoff::Live`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if the value is neither
    /// `"now"` nor an RFC 3339 timestamp.
    pub fn from_param(raw: Option<&str>) -> Result<Self, GatewayError> {
        raw.map_or(Ok(Self::Live), str::parse)
    }
}

impl FromStr for Cutoff {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("now") {
            return Ok(Self::Live);
        }
        DateTime::parse_from_rfc3339(s)
            .map(|t| Self::AsOf(t.with_timezone(&Utc)))
            .map_err(|e| GatewayError::InvalidRequest(format!("invalid older-than `{s}`: {e}")))
    }
}

impl fmt::Display for Cutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => f.write_str("now"),
            Self::AsOf(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}
