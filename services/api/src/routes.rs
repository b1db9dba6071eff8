use crate::infra::{validate_detections, AppState};
use aquavriksh::error::AppError;
use aquavriksh::workflows::submissions::{
    submission_router, Assessment, Classifier, Detection, SubmissionService, SubmissionStore,
};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_submission_routes<R, C>(service: Arc<SubmissionService<R, C>>) -> axum::Router
where
    R: SubmissionStore + 'static,
    C: Classifier + 'static,
{
    submission_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/scoring/preview",
            axum::routing::post(scoring_preview_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Dry-run the scoring policy without touching any stored state.
pub(crate) async fn scoring_preview_endpoint(
    Extension(state): Extension<AppState>,
    Json(detections): Json<Vec<Detection>>,
) -> Result<Json<Assessment>, AppError> {
    validate_detections(&detections)?;
    Ok(Json(state.policy.assess(&detections)))
}
