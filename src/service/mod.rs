//! Service layer: read-operation orchestration.
//!
//! [`HistoryService`] runs the query pipeline against a
//! [`crate::persistence::SnapshotStore`] under a per-round-trip deadline.

pub mod history_service;

pub use history_service::{HistoryService, ListQuery, Outcome};
