//! Application state for the web layer.

use std::sync::Arc;

use crate::service::FeedService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Feed fetch-and-merge pipeline, including the reference tables
    pub service: Arc<FeedService>,
}

impl AppState {
    pub fn new(service: FeedService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
