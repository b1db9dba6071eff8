use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::award::AwardError;
use super::classification::Classifier;
use super::domain::{BadgeId, Submission, SubmissionId, SubmissionIntake, UserId};
use super::repository::{RepositoryError, SubmissionStore};
use super::service::{SubmissionService, SubmissionServiceError};
use super::views::{SubmissionView, UserView};

const FAILED_LISTING_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub display_name: String,
}

/// Router builder exposing contributor, submission, operator, and badge endpoints.
pub fn submission_router<R, C>(service: Arc<SubmissionService<R, C>>) -> Router
where
    R: SubmissionStore + 'static,
    C: Classifier + 'static,
{
    Router::new()
        .route("/api/v1/users", post(register_handler::<R, C>))
        .route("/api/v1/users/:user_id", get(user_handler::<R, C>))
        .route(
            "/api/v1/users/:user_id/dashboard",
            get(dashboard_handler::<R, C>),
        )
        .route(
            "/api/v1/users/:user_id/submissions",
            post(submit_handler::<R, C>).get(user_submissions_handler::<R, C>),
        )
        .route(
            "/api/v1/submissions/:submission_id",
            get(submission_handler::<R, C>),
        )
        .route(
            "/api/v1/submissions/:submission_id/retry",
            post(retry_handler::<R, C>),
        )
        .route(
            "/api/v1/operator/failed-submissions",
            get(failed_submissions_handler::<R, C>),
        )
        .route("/api/v1/badges", get(badges_handler::<R, C>))
        .route("/api/v1/badges/:badge_id", get(badge_handler::<R, C>))
        .with_state(service)
}

pub(crate) async fn register_handler<R, C>(
    State(service): State<Arc<SubmissionService<R, C>>>,
    Json(request): Json<RegisterUserRequest>,
) -> Response
where
    R: SubmissionStore + 'static,
    C: Classifier + 'static,
{
    match service.register_user(&request.display_name) {
        Ok(user) => (StatusCode::CREATED, Json(UserView::from(&user))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn user_handler<R, C>(
    State(service): State<Arc<SubmissionService<R, C>>>,
    Path(user_id): Path<u64>,
) -> Response
where
    R: SubmissionStore + 'static,
    C: Classifier + 'static,
{
    match service.user(UserId(user_id)) {
        Ok(user) => (StatusCode::OK, Json(UserView::from(&user))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn dashboard_handler<R, C>(
    State(service): State<Arc<SubmissionService<R, C>>>,
    Path(user_id): Path<u64>,
) -> Response
where
    R: SubmissionStore + 'static,
    C: Classifier + 'static,
{
    match service.dashboard(UserId(user_id)) {
        Ok(dashboard) => (StatusCode::OK, Json(dashboard)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<R, C>(
    State(service): State<Arc<SubmissionService<R, C>>>,
    Path(user_id): Path<u64>,
    Json(intake): Json<SubmissionIntake>,
) -> Response
where
    R: SubmissionStore + 'static,
    C: Classifier + 'static,
{
    match service.submit(UserId(user_id), intake) {
        Ok(submission) => {
            service.spawn_processing(submission.id);
            (StatusCode::ACCEPTED, Json(SubmissionView::from(&submission))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn user_submissions_handler<R, C>(
    State(service): State<Arc<SubmissionService<R, C>>>,
    Path(user_id): Path<u64>,
) -> Response
where
    R: SubmissionStore + 'static,
    C: Classifier + 'static,
{
    match service.user_submissions(UserId(user_id)) {
        Ok(submissions) => {
            let views: Vec<SubmissionView> =
                submissions.iter().map(SubmissionView::from).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submission_handler<R, C>(
    State(service): State<Arc<SubmissionService<R, C>>>,
    Path(submission_id): Path<u64>,
) -> Response
where
    R: SubmissionStore + 'static,
    C: Classifier + 'static,
{
    match service.submission(SubmissionId(submission_id)) {
        Ok(submission) => {
            (StatusCode::OK, Json(SubmissionView::from(&submission))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn retry_handler<R, C>(
    State(service): State<Arc<SubmissionService<R, C>>>,
    Path(submission_id): Path<u64>,
) -> Response
where
    R: SubmissionStore + 'static,
    C: Classifier + 'static,
{
    match service.reopen(SubmissionId(submission_id)) {
        Ok(submission) => {
            service.spawn_processing(submission.id);
            (StatusCode::ACCEPTED, Json(operator_view(&submission))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn failed_submissions_handler<R, C>(
    State(service): State<Arc<SubmissionService<R, C>>>,
) -> Response
where
    R: SubmissionStore + 'static,
    C: Classifier + 'static,
{
    match service.failed_submissions(FAILED_LISTING_LIMIT) {
        Ok(submissions) => {
            let views: Vec<serde_json::Value> = submissions.iter().map(operator_view).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn badges_handler<R, C>(
    State(service): State<Arc<SubmissionService<R, C>>>,
) -> Response
where
    R: SubmissionStore + 'static,
    C: Classifier + 'static,
{
    match service.badges() {
        Ok(badges) => (StatusCode::OK, Json(badges)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn badge_handler<R, C>(
    State(service): State<Arc<SubmissionService<R, C>>>,
    Path(badge_id): Path<u64>,
) -> Response
where
    R: SubmissionStore + 'static,
    C: Classifier + 'static,
{
    match service.badge(BadgeId(badge_id)) {
        Ok(badge) => (StatusCode::OK, Json(badge)).into_response(),
        Err(error) => error_response(error),
    }
}

/// Operators see the internal state and failure detail hidden from submitters.
fn operator_view(submission: &Submission) -> serde_json::Value {
    json!({
        "submission": SubmissionView::from(submission),
        "state": submission.status.label(),
        "classification_attempts": submission.classification_attempts,
        "last_failure": submission.last_failure,
    })
}

fn error_response(error: SubmissionServiceError) -> Response {
    let status = match &error {
        SubmissionServiceError::Intake(_) | SubmissionServiceError::InvalidDisplayName => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SubmissionServiceError::UnknownUser(_)
        | SubmissionServiceError::UnknownSubmission(_)
        | SubmissionServiceError::UnknownBadge(_)
        | SubmissionServiceError::Repository(RepositoryError::NotFound { .. })
        | SubmissionServiceError::Award(AwardError::Repository(RepositoryError::NotFound {
            ..
        })) => StatusCode::NOT_FOUND,
        SubmissionServiceError::Transition(_)
        | SubmissionServiceError::Award(AwardError::Transition(_))
        | SubmissionServiceError::Award(AwardError::OwnerMismatch { .. }) => StatusCode::CONFLICT,
        SubmissionServiceError::Repository(_) | SubmissionServiceError::Award(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, Json(json!({ "error": error.to_string() }))).into_response()
}
