//! Tactic API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod dto;
mod error;
mod handlers;
mod state;

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tactic_application::{
    AutofillCache, AutofillService, EventDocumentStore, EventMetadataStore, EventService,
    EventSideEffects, FallbackService, GenerativeTextService, OrchestratorService,
};
use tactic_core::AppError;
use tactic_domain::EventValidator;
use tactic_infrastructure::{
    GeminiSettings, HttpGenerativeTextService, InMemoryEventDocumentStore,
    InMemoryEventMetadataStore, PostgresEventDocumentStore, PostgresEventMetadataStore,
    TracingEventSideEffects, WebhookEventSideEffects,
};
use tracing::{info, warn};

use crate::api_config::{ApiConfig, StorageBackend, init_tracing};
use crate::state::AppState;

type Stores = (
    Arc<dyn EventDocumentStore>,
    Arc<dyn EventMetadataStore>,
    Option<PgPool>,
);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let (documents, metadata_store, pool): Stores = match &config.storage_backend {
        StorageBackend::Memory => (
            Arc::new(InMemoryEventDocumentStore::new()),
            Arc::new(InMemoryEventMetadataStore::new()),
            None,
        ),
        StorageBackend::Postgres { database_url } => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to connect to database: {error}"))
                })?;

            sqlx::migrate!("../../crates/infrastructure/migrations")
                .run(&pool)
                .await
                .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

            if config.migrate_only {
                info!("database migrations applied successfully");
                return Ok(());
            }

            (
                Arc::new(PostgresEventDocumentStore::new(pool.clone())),
                Arc::new(PostgresEventMetadataStore::new(pool.clone())),
                Some(pool),
            )
        }
    };

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_seconds))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let generative: Option<Arc<dyn GenerativeTextService>> =
        match (&config.gemini, config.enable_llm_generation) {
            (Some(gemini), true) => {
                let service: Arc<dyn GenerativeTextService> =
                    Arc::new(HttpGenerativeTextService::new(
                        http_client.clone(),
                        GeminiSettings {
                            api_key: gemini.api_key.clone(),
                            model: gemini.model.clone(),
                            base_url: gemini.base_url.clone(),
                            max_attempts: config.generative_max_attempts,
                            retry_backoff_ms: config.generative_retry_backoff_ms,
                        },
                    ));
                Some(service)
            }
            (None, true) => {
                warn!("GEMINI_API_KEY is not set, generative features are disabled");
                None
            }
            (_, false) => None,
        };

    let side_effects: Arc<dyn EventSideEffects> = match &config.notification_webhook_url {
        Some(endpoint) => Arc::new(WebhookEventSideEffects::new(
            http_client,
            endpoint.as_str(),
            config.generative_max_attempts,
            config.generative_retry_backoff_ms,
        )),
        None => Arc::new(TracingEventSideEffects),
    };

    let validator = Arc::new(EventValidator::new());

    let mut event_service = EventService::new(documents.clone(), metadata_store.clone());
    if config.enable_autofill {
        let mut autofill = AutofillService::new(Arc::new(AutofillCache::new()));
        if let Some(generative) = &generative {
            autofill = autofill.with_generative(generative.clone());
        }
        event_service = event_service.with_autofill(autofill);
    }
    if let Some(generative) = &generative {
        event_service = event_service.with_form_generator(generative.clone());
    }

    let mut fallback = FallbackService::new(validator.clone(), metadata_store.clone());
    if let Some(generative) = generative {
        fallback = fallback.with_generative(generative);
    }

    let orchestrator = OrchestratorService::new(
        validator,
        fallback,
        Arc::new(event_service.clone()),
        documents,
        metadata_store,
        side_effects,
    )
    .with_fallback_enabled(config.enable_fallback);

    info!(
        storage_backend = config.storage_backend.as_str(),
        autofill = config.enable_autofill,
        fallback = config.enable_fallback,
        llm_generation = config.enable_llm_generation && config.gemini.is_some(),
        "event pipeline configured"
    );

    let app_state = AppState {
        orchestrator,
        event_service,
        storage_backend: config.storage_backend.as_str(),
        pool,
    };
    let app = api_router::build_router(app_state, &config.cors_origins)?;

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "tactic-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
