use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::{header::AUTHORIZATION, request::Parts};
use axum::Json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::AppState;

/// Identity of a request carrying a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized("Unauthorized"))?;

        match state.keys.verify(token) {
            Ok(claims) => Ok(AuthUser {
                user_id: claims.sub,
                email: claims.email,
            }),
            Err(e) => {
                warn!(error = %e, "rejected bearer token");
                Err(AppError::Unauthorized("Unauthorized"))
            }
        }
    }
}

/// JSON request body whose rejections use the API's `{"error"}` shape.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                debug!(status = %rejection.status(), reason = %rejection.body_text(), "rejected request body");
                Err(AppError::BadRequest("invalid request body"))
            }
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}
