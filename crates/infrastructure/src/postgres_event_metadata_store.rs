use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use tactic_application::{
    BatchRun, EventMetadataRecord, EventMetadataStore, FallbackResult, WorkflowRun,
};
use tactic_core::{AppError, AppResult};

/// PostgreSQL-backed metadata and audit store.
#[derive(Clone)]
pub struct PostgresEventMetadataStore {
    pool: PgPool,
}

impl PostgresEventMetadataStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_json<T: Serialize>(value: &T, context: &str) -> AppResult<Value> {
    serde_json::to_value(value)
        .map_err(|error| AppError::Internal(format!("failed to serialize {context}: {error}")))
}

fn to_i32(value: usize, context: &str) -> AppResult<i32> {
    i32::try_from(value)
        .map_err(|error| AppError::Validation(format!("invalid {context} value: {error}")))
}

#[async_trait]
impl EventMetadataStore for PostgresEventMetadataStore {
    async fn store_event_metadata(&self, record: EventMetadataRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO event_metadata (
                event_id,
                event_type,
                title,
                status,
                autofill_applied,
                form_field_count,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.event_id.as_uuid())
        .bind(record.event_type.as_str())
        .bind(record.title.as_str())
        .bind(record.status.as_str())
        .bind(record.autofill_applied)
        .bind(to_i32(record.form_field_count, "form_field_count")?)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to store metadata for event '{}': {error}",
                record.event_id
            ))
        })?;

        Ok(())
    }

    async fn update_event_metadata(&self, record: EventMetadataRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO event_metadata (
                event_id,
                event_type,
                title,
                status,
                autofill_applied,
                form_field_count,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (event_id)
            DO UPDATE SET
                event_type = EXCLUDED.event_type,
                title = EXCLUDED.title,
                status = EXCLUDED.status,
                autofill_applied = EXCLUDED.autofill_applied,
                form_field_count = EXCLUDED.form_field_count,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.event_id.as_uuid())
        .bind(record.event_type.as_str())
        .bind(record.title.as_str())
        .bind(record.status.as_str())
        .bind(record.autofill_applied)
        .bind(to_i32(record.form_field_count, "form_field_count")?)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to update metadata for event '{}': {error}",
                record.event_id
            ))
        })?;

        Ok(())
    }

    async fn store_workflow_result(&self, run: &WorkflowRun) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO workflow_runs (
                workflow_id,
                workflow_type,
                status,
                event_id,
                start_time,
                end_time,
                duration_seconds,
                steps,
                payload,
                error
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (workflow_id)
            DO UPDATE SET
                status = EXCLUDED.status,
                event_id = EXCLUDED.event_id,
                end_time = EXCLUDED.end_time,
                duration_seconds = EXCLUDED.duration_seconds,
                steps = EXCLUDED.steps,
                error = EXCLUDED.error
            "#,
        )
        .bind(run.workflow_id.as_str())
        .bind(run.workflow_type.as_str())
        .bind(run.status.as_str())
        .bind(run.event_id.map(|event_id| event_id.as_uuid()))
        .bind(run.start_time)
        .bind(run.end_time)
        .bind(run.duration_seconds)
        .bind(to_json(&run.steps, "workflow steps")?)
        .bind(run.payload.clone().into_value())
        .bind(run.error.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to store workflow run '{}': {error}",
                run.workflow_id
            ))
        })?;

        Ok(())
    }

    async fn store_batch_result(&self, batch: &BatchRun) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO batch_runs (
                batch_id,
                total_events,
                processed_events,
                failed_events,
                duration_seconds,
                results,
                started_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(batch.batch_id.as_str())
        .bind(to_i32(batch.total_events, "total_events")?)
        .bind(to_i32(batch.processed_events, "processed_events")?)
        .bind(to_i32(batch.failed_events, "failed_events")?)
        .bind(batch.duration)
        .bind(to_json(&batch.results, "batch results")?)
        .bind(batch.started_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to store batch '{}': {error}",
                batch.batch_id
            ))
        })?;

        Ok(())
    }

    async fn store_fallback_result(&self, result: &FallbackResult) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO fallback_results (
                fallback_id,
                status,
                correction_method,
                original_payload,
                processed_payload,
                errors,
                recorded_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(result.fallback_id.as_str())
        .bind(result.status.as_str())
        .bind(result.correction_method.as_str())
        .bind(result.original_payload.clone().into_value())
        .bind(
            result
                .processed_payload
                .clone()
                .map(tactic_domain::EventPayload::into_value),
        )
        .bind(to_json(&result.errors, "fallback errors")?)
        .bind(result.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to store fallback result '{}': {error}",
                result.fallback_id
            ))
        })?;

        Ok(())
    }
}
