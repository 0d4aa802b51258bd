use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::error::AppError;
use crate::middleware::{AuthUser, JsonBody};
use crate::models::{SuggestRequest, SuggestResponse};
use crate::AppState;

pub async fn suggest(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SuggestRequest>,
) -> Result<(StatusCode, Json<SuggestResponse>), AppError> {
    if req.input.is_empty() {
        return Err(AppError::BadRequest("input must not be empty"));
    }

    let suggestions = state.suggestions.suggest(&req.input).await?;
    info!(user_id = %auth.user_id, "served suggestions");
    Ok((
        StatusCode::CREATED,
        Json(SuggestResponse {
            suggestions,
            user: auth.user_id,
        }),
    ))
}
