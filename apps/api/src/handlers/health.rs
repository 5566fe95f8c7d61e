use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::dto::HealthResponse;
use crate::state::AppState;

pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let Some(pool) = state.pool.as_ref() else {
        return (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                storage_backend: state.storage_backend,
                detail: None,
            }),
        );
    };

    match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                storage_backend: state.storage_backend,
                detail: None,
            }),
        ),
        Err(error) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "error",
                storage_backend: state.storage_backend,
                detail: Some(format!("postgres check failed: {error}")),
            }),
        ),
    }
}
