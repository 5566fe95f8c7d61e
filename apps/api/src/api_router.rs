use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use tactic_core::AppError;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(app_state: AppState, cors_origins: &[String]) -> Result<Router, AppError> {
    let event_routes = Router::new()
        .route("/api/events", post(handlers::events::create_event_handler))
        .route(
            "/api/events/batch",
            post(handlers::events::batch_events_handler),
        )
        .route(
            "/api/events/fallback",
            post(handlers::events::fallback_event_handler),
        )
        .route(
            "/api/events/{event_id}",
            get(handlers::events::get_event_handler)
                .put(handlers::events::update_event_handler)
                .delete(handlers::events::delete_event_handler),
        );

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(event_routes)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(cors_origins)?)
        .with_state(app_state))
}

fn build_cors_layer(cors_origins: &[String]) -> Result<CorsLayer, AppError> {
    let allow_origin = if cors_origins.iter().any(|origin| origin == "*") {
        AllowOrigin::from(Any)
    } else {
        let origins = cors_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|error| {
                    AppError::Validation(format!("invalid CORS origin '{origin}': {error}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE]))
}
