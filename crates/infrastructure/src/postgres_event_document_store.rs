use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tactic_application::EventDocumentStore;
use tactic_core::{AppError, AppResult, EventId};
use tactic_domain::{EventDocument, EventPayload, FormFields};

/// PostgreSQL-backed event document store.
#[derive(Clone)]
pub struct PostgresEventDocumentStore {
    pool: PgPool,
}

impl PostgresEventDocumentStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct EventDocumentRow {
    event_id: uuid::Uuid,
    form_fields: Value,
    data: Value,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl EventDocumentRow {
    fn into_document(self) -> AppResult<EventDocument> {
        let event_id = EventId::from_uuid(self.event_id);
        let data = EventPayload::from_value(self.data).map_err(|error| {
            AppError::Internal(format!("stored payload of event '{event_id}' is invalid: {error}"))
        })?;
        let form_fields = FormFields::from_value(self.form_fields).map_err(|error| {
            AppError::Internal(format!(
                "stored form fields of event '{event_id}' are invalid: {error}"
            ))
        })?;

        Ok(EventDocument::new(event_id, data, form_fields, self.created_at)?
            .with_updated_at(self.updated_at))
    }
}

fn form_fields_json(document: &EventDocument) -> AppResult<Value> {
    serde_json::to_value(document.form_fields()).map_err(|error| {
        AppError::Internal(format!(
            "failed to serialize form fields of event '{}': {error}",
            document.event_id()
        ))
    })
}

#[async_trait]
impl EventDocumentStore for PostgresEventDocumentStore {
    async fn store(&self, document: EventDocument) -> AppResult<()> {
        let form_fields = form_fields_json(&document)?;

        let result = sqlx::query(
            r#"
            INSERT INTO event_documents (
                event_id,
                event_type,
                title,
                description,
                metadata,
                status,
                form_fields,
                data,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(document.event_id().as_uuid())
        .bind(document.event_type().as_str())
        .bind(document.title())
        .bind(document.description())
        .bind(Value::Object(document.metadata().clone()))
        .bind(document.status())
        .bind(form_fields)
        .bind(document.data().clone().into_value())
        .bind(document.created_at())
        .bind(document.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to store event '{}': {error}",
                document.event_id()
            ))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "event '{}' already exists",
                document.event_id()
            )));
        }

        Ok(())
    }

    async fn get(&self, event_id: EventId) -> AppResult<Option<EventDocument>> {
        let row = sqlx::query_as::<_, EventDocumentRow>(
            r#"
            SELECT event_id, form_fields, data, created_at, updated_at
            FROM event_documents
            WHERE event_id = $1
            "#,
        )
        .bind(event_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load event '{event_id}': {error}")))?;

        row.map(EventDocumentRow::into_document).transpose()
    }

    async fn update(&self, document: EventDocument) -> AppResult<()> {
        let form_fields = form_fields_json(&document)?;

        let result = sqlx::query(
            r#"
            UPDATE event_documents
            SET
                event_type = $2,
                title = $3,
                description = $4,
                metadata = $5,
                status = $6,
                form_fields = $7,
                data = $8,
                updated_at = COALESCE($9, now())
            WHERE event_id = $1
            "#,
        )
        .bind(document.event_id().as_uuid())
        .bind(document.event_type().as_str())
        .bind(document.title())
        .bind(document.description())
        .bind(Value::Object(document.metadata().clone()))
        .bind(document.status())
        .bind(form_fields)
        .bind(document.data().clone().into_value())
        .bind(document.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to update event '{}': {error}",
                document.event_id()
            ))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "event '{}' does not exist",
                document.event_id()
            )));
        }

        Ok(())
    }

    async fn delete(&self, event_id: EventId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM event_documents WHERE event_id = $1")
            .bind(event_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to delete event '{event_id}': {error}"))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use sqlx::PgPool;
    use sqlx::migrate::Migrator;
    use sqlx::postgres::PgPoolOptions;
    use tactic_application::EventDocumentStore;
    use tactic_core::{AppError, EventId};
    use tactic_domain::{EventDocument, EventPayload, FormFields};

    use super::PostgresEventDocumentStore;

    static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

    async fn test_pool() -> Option<PgPool> {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            return None;
        };

        let pool = match PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url.as_str())
            .await
        {
            Ok(pool) => pool,
            Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
        };

        if let Err(error) = MIGRATOR.run(&pool).await {
            panic!("failed to run migrations for postgres event tests: {error}");
        }

        Some(pool)
    }

    #[tokio::test]
    async fn documents_round_trip_through_postgres() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let store = PostgresEventDocumentStore::new(pool);

        let payload = EventPayload::from_value(json!({
            "title": "Platform Summit",
            "event_type": "conference",
            "capacity": 250,
            "metadata": {"track": "infra"},
        }));
        assert!(payload.is_ok());
        let document = EventDocument::new(
            EventId::new(),
            payload.unwrap_or_else(|_| unreachable!()),
            FormFields::default(),
            Utc::now(),
        );
        assert!(document.is_ok());
        let document = document.unwrap_or_else(|_| unreachable!());
        let event_id = document.event_id();

        assert!(store.store(document.clone()).await.is_ok());
        assert!(matches!(
            store.store(document).await,
            Err(AppError::Conflict(_))
        ));

        let loaded = store.get(event_id).await;
        assert!(loaded.is_ok());
        let loaded = loaded.unwrap_or_default();
        assert_eq!(loaded.as_ref().map(EventDocument::title), Some("Platform Summit"));
        assert_eq!(
            loaded.as_ref().and_then(|document| document.data().get("capacity").cloned()),
            Some(json!(250))
        );

        assert!(matches!(store.delete(event_id).await, Ok(true)));
        assert!(matches!(store.get(event_id).await, Ok(None)));
    }
}
