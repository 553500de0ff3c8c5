pub mod attempt;
pub mod auth;
pub mod exam;
pub mod export;
pub mod extract;
pub mod health;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::{middleware::auth::require_bearer_auth, AppState};

/// Builds the full application router. Everything under `/api` except
/// registration and login requires a bearer token.
pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health::health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login));

    let protected = Router::new()
        .route("/api/exams", get(exam::list_exams).post(exam::create_exam))
        .route(
            "/api/exams/:id",
            get(exam::get_exam)
                .patch(exam::update_exam)
                .delete(exam::delete_exam),
        )
        .route("/api/exams/:id/questions", post(exam::add_question))
        .route(
            "/api/exams/:id/attempts",
            get(attempt::list_attempts).post(attempt::submit_attempt),
        )
        .route("/api/exams/:id/results", get(attempt::exam_results))
        .route("/api/exams/:id/results/export", get(export::export_exam_results))
        .route(
            "/api/questions/:id",
            axum::routing::patch(exam::update_question).delete(exam::delete_question),
        )
        .route(
            "/api/questions/:id/correct-option",
            post(exam::set_correct_option),
        )
        .route("/api/attempts/:id/report", get(attempt::get_report))
        .route("/api/attempts/:id/export", get(export::export_attempt))
        .route_layer(from_fn_with_state(state.clone(), require_bearer_auth));

    public.merge(protected).with_state(state)
}
