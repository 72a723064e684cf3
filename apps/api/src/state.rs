use std::sync::Arc;

use crate::config::Config;
use crate::jobs::orchestrator::Orchestrator;
use crate::jobs::store::JobStore;
use crate::storage::ObjectStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// CV bucket. Upload writes here; the orchestrator reads back through its own handle.
    pub storage: Arc<dyn ObjectStore>,
    pub jobs: Arc<dyn JobStore>,
    pub orchestrator: Orchestrator,
}
