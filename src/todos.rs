//! Per-user todo records. Every operation takes the caller's user id and
//! never touches rows owned by anyone else.

use tracing::info;
use uuid::Uuid;

use crate::db::{self, DbPool};
use crate::error::AppError;
use crate::models::{DeletedTodo, Todo, UpdateTodo, UpdatedTodo};

const EMPTY_BODY: &str = "todo cannot be empty";
const NOT_FOUND: &str = "todo not found";

pub fn create(pool: &DbPool, user_id: Uuid, body: &str) -> Result<Todo, AppError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::BadRequest(EMPTY_BODY));
    }

    let todo = db::create_todo(pool, user_id, body)?;
    info!(%user_id, id = %todo.id, "created todo");
    Ok(todo)
}

pub fn list(pool: &DbPool, user_id: Uuid) -> Result<Vec<Todo>, AppError> {
    let todos = db::list_todos(pool, user_id)?;
    info!(%user_id, count = todos.len(), "listed todos");
    Ok(todos)
}

pub fn update(
    pool: &DbPool,
    user_id: Uuid,
    id: Uuid,
    patch: &UpdateTodo,
) -> Result<UpdatedTodo, AppError> {
    if db::find_active_todo(pool, user_id, id)?.is_none() {
        return Err(AppError::NotFound(NOT_FOUND));
    }

    let body = match patch.body.as_deref().map(str::trim) {
        Some("") => return Err(AppError::BadRequest(EMPTY_BODY)),
        other => other,
    };

    let todo = db::update_todo(pool, user_id, id, body, patch.is_done)?
        .ok_or(AppError::NotFound(NOT_FOUND))?;
    info!(%user_id, %id, is_done = todo.is_done, "updated todo");
    Ok(todo)
}

pub fn remove(pool: &DbPool, user_id: Uuid, id: Uuid) -> Result<DeletedTodo, AppError> {
    let deleted = db::soft_delete_todo(pool, user_id, id)?.ok_or(AppError::NotFound(NOT_FOUND))?;
    info!(%user_id, %id, "deleted todo");
    Ok(deleted)
}
