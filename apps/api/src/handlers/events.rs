use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tactic_application::{BatchRun, CreationReport, ProcessOutcome, UpdateReport};
use tactic_core::EventId;
use tactic_domain::EventPayload;

use crate::dto::{BatchRequest, EventResponse};
use crate::error::ApiResult;
use crate::state::AppState;

fn report_status(success: bool, on_success: StatusCode) -> StatusCode {
    if success {
        on_success
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    }
}

pub async fn create_event_handler(
    State(state): State<AppState>,
    Json(payload): Json<EventPayload>,
) -> (StatusCode, Json<CreationReport>) {
    let report = state.orchestrator.orchestrate_event_creation(payload).await;
    (report_status(report.success, StatusCode::CREATED), Json(report))
}

pub async fn update_event_handler(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(patch): Json<EventPayload>,
) -> ApiResult<(StatusCode, Json<UpdateReport>)> {
    let event_id = EventId::parse(event_id.as_str())?;
    let report = state
        .orchestrator
        .orchestrate_event_update(event_id, patch)
        .await;

    Ok((report_status(report.success, StatusCode::OK), Json(report)))
}

pub async fn batch_events_handler(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Json<BatchRun> {
    Json(
        state
            .orchestrator
            .orchestrate_batch_processing(request.events)
            .await,
    )
}

pub async fn fallback_event_handler(
    State(state): State<AppState>,
    Json(payload): Json<EventPayload>,
) -> (StatusCode, Json<ProcessOutcome>) {
    let outcome = state.orchestrator.fallback().process_event(&payload).await;
    (report_status(outcome.success, StatusCode::OK), Json(outcome))
}

pub async fn get_event_handler(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> ApiResult<Json<EventResponse>> {
    let event_id = EventId::parse(event_id.as_str())?;
    let document = state.event_service.get_event(event_id).await?;
    Ok(Json(EventResponse::from(document)))
}

pub async fn delete_event_handler(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> ApiResult<StatusCode> {
    let event_id = EventId::parse(event_id.as_str())?;
    state.event_service.delete_event(event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
