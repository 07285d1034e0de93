use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::ChatBackend;
use crate::taxonomy::Taxonomy;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything here is read-only; the last extraction result belongs to the caller.
#[derive(Clone)]
pub struct AppState {
    pub taxonomy: Arc<Taxonomy>,
    /// Chat backend. `LlmClient` in production, swappable in tests.
    pub llm: Arc<dyn ChatBackend>,
    pub config: Config,
}
