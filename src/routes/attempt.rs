use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;

use crate::{
    dto::attempt_dto::SubmitAttemptRequest,
    error::Result,
    middleware::auth::Claims,
    routes::extract::{AppJson, AppPath},
    AppState,
};

#[axum::debug_handler]
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(exam_id): AppPath<i64>,
    AppJson(payload): AppJson<SubmitAttemptRequest>,
) -> Result<impl IntoResponse> {
    let result = state
        .attempt_service
        .submit_attempt(claims.user_id()?, exam_id, payload.selections)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// The caller's own attempts at an exam, newest first.
#[axum::debug_handler]
pub async fn list_attempts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(exam_id): AppPath<i64>,
) -> Result<impl IntoResponse> {
    state.exam_service.get_exam(exam_id).await?;
    let attempts = state
        .attempt_service
        .list_attempts(claims.user_id()?, exam_id)
        .await?;
    Ok(Json(attempts))
}

#[axum::debug_handler]
pub async fn exam_results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(exam_id): AppPath<i64>,
) -> Result<impl IntoResponse> {
    let (exam, results) = state
        .attempt_service
        .list_exam_results(claims.user_id()?, exam_id)
        .await?;
    Ok(Json(json!({ "exam": exam, "results": results })))
}

#[axum::debug_handler]
pub async fn get_report(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(attempt_id): AppPath<i64>,
) -> Result<impl IntoResponse> {
    let report = state
        .attempt_service
        .build_report(claims.user_id()?, attempt_id)
        .await?;
    Ok(Json(report))
}
