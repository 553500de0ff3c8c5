use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    dto::auth_dto::{LoginRequest, LoginResponse, RegisterRequest},
    error::Result,
    routes::extract::AppJson,
    utils::token::issue_token,
    AppState,
};

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.register(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.authenticate(&payload).await?;
    let ttl_hours = state.config.token_ttl_hours;
    let token = issue_token(&user, &state.config.jwt_secret, ttl_hours)?;
    tracing::info!(user_id = user.id, "issued access token");

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: ttl_hours * 3600,
        user,
    }))
}
