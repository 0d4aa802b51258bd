use axum::response::{IntoResponse, Response};
use axum::{http::StatusCode, Json};
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum AppError {
    Database(String),
    /// Downstream failure. The detail is logged, never sent to the caller.
    Internal(String),
    Unauthorized(&'static str),
    Conflict(&'static str),
    NotFound(&'static str),
    BadRequest(&'static str),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Database(detail) => {
                error!(%detail, "database error");
                "internal server error"
            }
            AppError::Internal(detail) => {
                error!(%detail, "internal error");
                "internal server error"
            }
            AppError::Unauthorized(msg)
            | AppError::Conflict(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg) => msg,
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_hide_their_detail() {
        let resp = AppError::Internal("provider said: quota exceeded for sk-123".into())
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = AppError::Database("no such table: todos".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn domain_errors_map_to_their_status() {
        assert_eq!(AppError::Conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(AppError::Unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::BadRequest("x").status(), StatusCode::BAD_REQUEST);
    }
}
