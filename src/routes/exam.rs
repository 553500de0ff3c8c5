use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};

use crate::{
    dto::exam_dto::{
        CreateExamPayload, CreateQuestionPayload, PublicExam, SetCorrectOptionRequest,
        UpdateExamPayload,
    },
    error::{Error, Result},
    middleware::auth::Claims,
    routes::extract::{AppJson, AppPath},
    AppState,
};

/// Teachers see the exams they authored; students see every exam with
/// their latest attempt.
#[axum::debug_handler]
pub async fn list_exams(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response> {
    let user = state.user_service.get_user(claims.user_id()?).await?;
    if user.is_teacher() {
        let exams = state.exam_service.list_exams_by_author(user.id).await?;
        Ok(Json(exams).into_response())
    } else {
        let summaries = state
            .attempt_service
            .latest_attempts_for_student(user.id)
            .await?;
        Ok(Json(summaries).into_response())
    }
}

#[axum::debug_handler]
pub async fn create_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<CreateExamPayload>,
) -> Result<impl IntoResponse> {
    let exam = state
        .exam_service
        .create_exam(claims.user_id()?, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(exam)))
}

/// Full detail with correct flags for a teacher who manages the exam, the
/// public view for everyone else.
#[axum::debug_handler]
pub async fn get_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
) -> Result<Response> {
    let user = state.user_service.get_user(claims.user_id()?).await?;
    let detail = state.exam_service.get_exam_detail(id).await?;
    if user.is_teacher() && detail.exam.is_managed_by(user.id) {
        Ok(Json(detail).into_response())
    } else {
        Ok(Json(PublicExam::from(detail)).into_response())
    }
}

#[axum::debug_handler]
pub async fn update_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateExamPayload>,
) -> Result<impl IntoResponse> {
    let exam = state
        .exam_service
        .update_exam(claims.user_id()?, id, payload)
        .await?;
    Ok(Json(exam))
}

#[axum::debug_handler]
pub async fn delete_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode> {
    if state.exam_service.delete_exam(claims.user_id()?, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound(format!("Exam {} not found", id)))
    }
}

#[axum::debug_handler]
pub async fn add_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(exam_id): AppPath<i64>,
    AppJson(payload): AppJson<CreateQuestionPayload>,
) -> Result<impl IntoResponse> {
    let question = state
        .exam_service
        .add_question(
            claims.user_id()?,
            exam_id,
            payload,
            state.config.expected_option_count,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// Replaces a question's text and full option set.
#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<CreateQuestionPayload>,
) -> Result<impl IntoResponse> {
    let question = state
        .exam_service
        .update_question(
            claims.user_id()?,
            id,
            payload,
            state.config.expected_option_count,
        )
        .await?;
    Ok(Json(question))
}

#[axum::debug_handler]
pub async fn delete_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode> {
    if state.exam_service.delete_question(claims.user_id()?, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound(format!("Question {} not found", id)))
    }
}

#[axum::debug_handler]
pub async fn set_correct_option(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(question_id): AppPath<i64>,
    AppJson(payload): AppJson<SetCorrectOptionRequest>,
) -> Result<impl IntoResponse> {
    let options = state
        .exam_service
        .set_correct_option(claims.user_id()?, question_id, payload.option_id)
        .await?;
    Ok(Json(options))
}
