use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Result, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{DeletedTodo, Todo, UpdatedTodo, User};

pub type DbPool = Arc<Mutex<Connection>>;

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT UNIQUE NOT NULL,
        password_hash TEXT NOT NULL,
        display_name TEXT,
        created_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS todos (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id),
        body TEXT NOT NULL,
        is_done INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        deleted_at INTEGER
    );

    CREATE INDEX IF NOT EXISTS todos_owner_active ON todos (user_id, deleted_at, created_at);
";

pub fn init_db(path: &str) -> Result<DbPool> {
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

pub fn init_in_memory() -> Result<DbPool> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
}

fn lock(pool: &DbPool) -> Result<MutexGuard<'_, Connection>, AppError> {
    pool.lock()
        .map_err(|_| AppError::Database("connection mutex poisoned".to_string()))
}

// Timestamps are stored as unix nanoseconds.
fn to_nanos(ts: OffsetDateTime) -> i64 {
    ts.unix_timestamp_nanos() as i64
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> Result<OffsetDateTime> {
    let nanos: i64 = row.get(idx)?;
    OffsetDateTime::from_unix_timestamp_nanos(nanos as i128)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn uuid_at(row: &Row<'_>, idx: usize) -> Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn now() -> (OffsetDateTime, i64) {
    let ts = OffsetDateTime::now_utc();
    (ts, to_nanos(ts))
}

// User operations
pub fn find_user_by_email(pool: &DbPool, email: &str) -> Result<Option<User>, AppError> {
    let conn = lock(pool)?;
    let user = conn
        .query_row(
            "SELECT id, email, password_hash, display_name, created_at FROM users WHERE email = ?1",
            [email],
            |row| {
                Ok(User {
                    id: uuid_at(row, 0)?,
                    email: row.get(1)?,
                    password_hash: row.get(2)?,
                    display_name: row.get(3)?,
                    created_at: timestamp_at(row, 4)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

/// Inserts a new user. A duplicate email surfaces as `Conflict`.
pub fn create_user(
    pool: &DbPool,
    email: &str,
    password_hash: &str,
    display_name: Option<&str>,
) -> Result<User, AppError> {
    let conn = lock(pool)?;
    let id = Uuid::new_v4();
    let (created_at, stamp) = now();

    let inserted = conn.execute(
        "INSERT INTO users (id, email, password_hash, display_name, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (id.to_string(), email, password_hash, display_name, stamp),
    );
    match inserted {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            return Err(AppError::Conflict("email already used"));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(User {
        id,
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        display_name: display_name.map(str::to_string),
        created_at,
    })
}

// Todo operations
const TODO_COLUMNS: &str = "id, body, is_done, created_at, updated_at";

fn todo_from_row(row: &Row<'_>) -> Result<Todo> {
    Ok(Todo {
        id: uuid_at(row, 0)?,
        body: row.get(1)?,
        is_done: row.get::<_, i32>(2)? != 0,
        created_at: timestamp_at(row, 3)?,
        updated_at: timestamp_at(row, 4)?,
    })
}

pub fn create_todo(pool: &DbPool, user_id: Uuid, body: &str) -> Result<Todo, AppError> {
    let conn = lock(pool)?;
    let id = Uuid::new_v4();
    let (created_at, stamp) = now();

    conn.execute(
        "INSERT INTO todos (id, user_id, body, is_done, created_at, updated_at)
         VALUES (?1, ?2, ?3, 0, ?4, ?4)",
        (id.to_string(), user_id.to_string(), body, stamp),
    )?;

    Ok(Todo {
        id,
        body: body.to_string(),
        is_done: false,
        created_at,
        updated_at: created_at,
    })
}

/// Active todos of one user, newest first.
pub fn list_todos(pool: &DbPool, user_id: Uuid) -> Result<Vec<Todo>, AppError> {
    let conn = lock(pool)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {TODO_COLUMNS} FROM todos
         WHERE user_id = ?1 AND deleted_at IS NULL
         ORDER BY created_at DESC, rowid DESC"
    ))?;
    let todos = stmt
        .query_map([user_id.to_string()], todo_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(todos)
}

pub fn find_active_todo(pool: &DbPool, user_id: Uuid, id: Uuid) -> Result<Option<Todo>, AppError> {
    let conn = lock(pool)?;
    find_active_todo_internal(&conn, user_id, id)
}

fn find_active_todo_internal(
    conn: &Connection,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<Todo>, AppError> {
    let todo = conn
        .query_row(
            &format!(
                "SELECT {TODO_COLUMNS} FROM todos
                 WHERE id = ?1 AND user_id = ?2 AND deleted_at IS NULL"
            ),
            (id.to_string(), user_id.to_string()),
            todo_from_row,
        )
        .optional()?;
    Ok(todo)
}

/// Applies the given fields to an active todo owned by `user_id`. Returns
/// `None` when no such todo exists. With no fields the current state is
/// returned unchanged.
pub fn update_todo(
    pool: &DbPool,
    user_id: Uuid,
    id: Uuid,
    body: Option<&str>,
    is_done: Option<bool>,
) -> Result<Option<UpdatedTodo>, AppError> {
    let conn = lock(pool)?;

    let mut updates = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(b) = body {
        updates.push("body = ?");
        params.push(Box::new(b.to_string()));
    }
    if let Some(done) = is_done {
        updates.push("is_done = ?");
        params.push(Box::new(done as i32));
    }

    if updates.is_empty() {
        return Ok(find_active_todo_internal(&conn, user_id, id)?.map(|t| UpdatedTodo {
            id: t.id,
            body: t.body,
            is_done: t.is_done,
            updated_at: t.updated_at,
        }));
    }

    updates.push("updated_at = ?");
    params.push(Box::new(now().1));
    params.push(Box::new(id.to_string()));
    params.push(Box::new(user_id.to_string()));

    let query = format!(
        "UPDATE todos SET {} WHERE id = ? AND user_id = ? AND deleted_at IS NULL",
        updates.join(", ")
    );

    let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    if conn.execute(&query, params_refs.as_slice())? == 0 {
        return Ok(None);
    }

    Ok(find_active_todo_internal(&conn, user_id, id)?.map(|t| UpdatedTodo {
        id: t.id,
        body: t.body,
        is_done: t.is_done,
        updated_at: t.updated_at,
    }))
}

/// Marks an active todo owned by `user_id` as deleted.
pub fn soft_delete_todo(
    pool: &DbPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<DeletedTodo>, AppError> {
    let conn = lock(pool)?;
    let (deleted_at, stamp) = now();
    let rows = conn.execute(
        "UPDATE todos SET deleted_at = ?1
         WHERE id = ?2 AND user_id = ?3 AND deleted_at IS NULL",
        (stamp, id.to_string(), user_id.to_string()),
    )?;
    if rows == 0 {
        return Ok(None);
    }
    Ok(Some(DeletedTodo { id, deleted_at }))
}
