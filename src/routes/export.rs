use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension,
};

use crate::{
    error::Result,
    middleware::auth::Claims,
    routes::extract::AppPath,
    services::export_service::{ExportService, XLSX_CONTENT_TYPE},
    AppState,
};

fn xlsx_response(filename: String, buffer: Vec<u8>) -> impl IntoResponse {
    let disposition = format!("attachment; filename=\"{}\"", filename);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buffer,
    )
}

/// Export one attempt's result form as XLSX
#[axum::debug_handler]
pub async fn export_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(attempt_id): AppPath<i64>,
) -> Result<impl IntoResponse> {
    let report = state
        .attempt_service
        .build_report(claims.user_id()?, attempt_id)
        .await?;
    let buffer = ExportService::attempt_report_xlsx(&report)?;
    let filename = format!("exam_{}_attempt_{}.xlsx", report.exam_id, report.attempt_id);
    Ok(xlsx_response(filename, buffer))
}

/// Export every attempt at an exam as XLSX
#[axum::debug_handler]
pub async fn export_exam_results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(exam_id): AppPath<i64>,
) -> Result<impl IntoResponse> {
    let (exam, rows) = state
        .attempt_service
        .list_exam_results(claims.user_id()?, exam_id)
        .await?;
    let buffer = ExportService::exam_results_xlsx(&exam, &rows)?;
    let filename = format!(
        "exam_{}_results_{}.xlsx",
        exam.id,
        chrono::Utc::now().format("%Y%m%d")
    );
    tracing::info!(exam_id = exam.id, rows = rows.len(), "exported exam results");
    Ok(xlsx_response(filename, buffer))
}
