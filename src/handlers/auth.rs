use axum::{extract::State, http::StatusCode, Json};

use crate::accounts;
use crate::error::AppError;
use crate::middleware::JsonBody;
use crate::models::{LoginRequest, LoginResponse, RegisterRequest, RegisteredUser};
use crate::AppState;

pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisteredUser>), AppError> {
    let user = accounts::register(
        &state.db,
        &req.email,
        &req.password,
        req.display_name.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let resp = accounts::login(&state.db, &state.keys, &req.email, &req.password).await?;
    Ok(Json(resp))
}
