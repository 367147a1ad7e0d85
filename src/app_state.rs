//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::HistoryService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// History service for every read operation.
    pub history_service: Arc<HistoryService>,
}

impl AppState {
    /// Wraps a service.
    #[must_use]
    pub fn new(history_service: HistoryService) -> Self {
        Self {
            history_service: Arc::new(history_service),
        }
    }
}
