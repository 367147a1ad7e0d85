//! The read pipeline as plain functions:
//! filter -> resolve -> (trail) -> sort/page.
//!
//! Nothing here touches a store. Stores feed rows in and the
//! [`HistoryService`](crate::service::HistoryService) strings the stages
//! together, so each stage is testable on in-memory vectors.

pub mod filter;
pub mod paging;
pub mod resolver;
pub mod trail;

pub use crate::domain::SnapshotHeader;
pub use filter::{KeywordSearch, Locations, SearchField, Searchable, SnapshotFilter};
pub use paging::{PageRequest, Pagination, SortValue, Sortable, paginate, sort_items};
pub use resolver::{is_candidate, resolve, resolve_one};
pub use trail::{HistorySet, build_all_trails, build_trail};
