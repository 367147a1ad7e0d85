//! # hostdata-gateway
//!
//! Read API over an append-only history of host inventory snapshots.
//!
//! Hosts are observed periodically; every observation is stored as an
//! immutable snapshot. This crate answers two kinds of questions against
//! that history:
//!
//! - what did the inventory look like as of an instant (as-of resolution),
//! - how did one database, PDB or disk group change over time (change
//!   trails).
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── HistoryService (service/)
//!     │
//!     ├── filter → resolve → trail → sort/page (query/)
//!     ├── Snapshot, sub-entities, Cutoff (domain/)
//!     │
//!     └── SnapshotStore: PostgreSQL or in-memory (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod query;
pub mod service;
