use axum::extract::{Path, State};
use axum::{http::StatusCode, Json};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::{AuthUser, JsonBody};
use crate::models::{CreateTodo, DeletedTodo, Todo, UpdateTodo, UpdatedTodo};
use crate::todos;
use crate::AppState;

// An id that is not a UUID cannot name an existing todo.
fn todo_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("todo not found"))
}

pub async fn list_todos(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Todo>>, AppError> {
    Ok(Json(todos::list(&state.db, auth.user_id)?))
}

pub async fn create_todo(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateTodo>,
) -> Result<(StatusCode, Json<Todo>), AppError> {
    let todo = todos::create(&state.db, auth.user_id, &req.body)?;
    Ok((StatusCode::CREATED, Json(todo)))
}

pub async fn update_todo(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<UpdateTodo>,
) -> Result<Json<UpdatedTodo>, AppError> {
    let id = todo_id(&id)?;
    Ok(Json(todos::update(&state.db, auth.user_id, id, &patch)?))
}

pub async fn delete_todo(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletedTodo>, AppError> {
    let id = todo_id(&id)?;
    Ok(Json(todos::remove(&state.db, auth.user_id, id)?))
}
