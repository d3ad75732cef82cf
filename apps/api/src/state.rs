use std::sync::Arc;

use crate::interviews::lifecycle::InterviewService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns the store and provider clients; constructed once in `main`.
    pub interviews: Arc<InterviewService>,
}
