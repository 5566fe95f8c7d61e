use sqlx::PgPool;
use tactic_application::{EventService, OrchestratorService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: OrchestratorService,
    pub event_service: EventService,
    pub storage_backend: &'static str,
    pub pool: Option<PgPool>,
}
