//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod disabled_generative_text_service;
mod http_generative_text_service;
mod in_memory_event_document_store;
mod in_memory_event_metadata_store;
mod postgres_event_document_store;
mod postgres_event_metadata_store;
mod tracing_event_side_effects;
mod webhook_event_side_effects;

pub use disabled_generative_text_service::DisabledGenerativeTextService;
pub use http_generative_text_service::{
    GeminiSettings, HttpGenerativeTextService, MAX_GENERATIVE_ATTEMPTS,
};
pub use in_memory_event_document_store::InMemoryEventDocumentStore;
pub use in_memory_event_metadata_store::InMemoryEventMetadataStore;
pub use postgres_event_document_store::PostgresEventDocumentStore;
pub use postgres_event_metadata_store::PostgresEventMetadataStore;
pub use tracing_event_side_effects::TracingEventSideEffects;
pub use webhook_event_side_effects::WebhookEventSideEffects;
