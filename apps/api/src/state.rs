use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::LlmBackend;
use crate::search::SearchBackend;
use crate::session::store::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
/// The two external collaborators are trait objects so providers (and test
/// stubs) can be swapped without touching the controller.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn LlmBackend>,
    pub search: Arc<dyn SearchBackend>,
    pub sessions: Arc<SessionStore>,
    pub config: Config,
}
