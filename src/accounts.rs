use tracing::{info, warn};

use crate::auth::{hash_password, normalize_email, verify_password, TokenKeys};
use crate::db::{self, DbPool};
use crate::error::AppError;
use crate::models::{LoginResponse, RegisteredUser};

const INVALID_CREDENTIALS: &str = "invalid credentials";

pub async fn register(
    pool: &DbPool,
    email: &str,
    password: &str,
    display_name: Option<&str>,
) -> Result<RegisteredUser, AppError> {
    let email = normalize_email(email);
    if db::find_user_by_email(pool, &email)?.is_some() {
        return Err(AppError::Conflict("email already used"));
    }

    let password = password.to_string();
    let password_hash = run_blocking(move || hash_password(&password)).await??;
    let user = db::create_user(pool, &email, &password_hash, display_name)?;
    info!(user_id = %user.id, "registered user");
    Ok(user.into())
}

/// Unknown email and wrong password fail with the same error.
pub async fn login(
    pool: &DbPool,
    keys: &TokenKeys,
    email: &str,
    password: &str,
) -> Result<LoginResponse, AppError> {
    let email = normalize_email(email);
    let Some(user) = db::find_user_by_email(pool, &email)? else {
        warn!("login failed");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS));
    };

    let password = password.to_string();
    let stored_hash = user.password_hash.clone();
    if !run_blocking(move || verify_password(&password, &stored_hash)).await? {
        warn!(user_id = %user.id, "login failed");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS));
    }

    let access_token = keys.sign(user.id, &user.email)?;
    info!(user_id = %user.id, "user logged in");

    Ok(LoginResponse {
        access_token,
        display_name: user.display_name,
    })
}

// Argon2 is CPU-bound; keep it off the async workers.
async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("password task failed: {e}")))
}
