use std::collections::HashMap;

use async_trait::async_trait;
use tactic_application::EventDocumentStore;
use tactic_core::{AppError, AppResult, EventId};
use tactic_domain::EventDocument;
use tokio::sync::RwLock;

/// In-memory event document store.
#[derive(Debug, Default)]
pub struct InMemoryEventDocumentStore {
    documents: RwLock<HashMap<EventId, EventDocument>>,
}

impl InMemoryEventDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Returns whether no documents are stored.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl EventDocumentStore for InMemoryEventDocumentStore {
    async fn store(&self, document: EventDocument) -> AppResult<()> {
        let mut documents = self.documents.write().await;
        let event_id = document.event_id();

        if documents.contains_key(&event_id) {
            return Err(AppError::Conflict(format!(
                "event '{event_id}' already exists"
            )));
        }

        documents.insert(event_id, document);
        Ok(())
    }

    async fn get(&self, event_id: EventId) -> AppResult<Option<EventDocument>> {
        Ok(self.documents.read().await.get(&event_id).cloned())
    }

    async fn update(&self, document: EventDocument) -> AppResult<()> {
        let mut documents = self.documents.write().await;
        let event_id = document.event_id();

        let Some(stored) = documents.get_mut(&event_id) else {
            return Err(AppError::NotFound(format!("event '{event_id}' does not exist")));
        };

        *stored = document;
        Ok(())
    }

    async fn delete(&self, event_id: EventId) -> AppResult<bool> {
        Ok(self.documents.write().await.remove(&event_id).is_some())
    }
}
