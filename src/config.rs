use std::time::Duration;

use crate::suggest::{DEFAULT_BASE_URL, DEFAULT_MODEL};

pub const DEFAULT_PORT: u16 = 3333;
pub const DEFAULT_DATABASE_PATH: &str = "todos.db";
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
}

impl Config {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Empty values count as unset.
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(v) => v.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: v,
            })?,
            None => DEFAULT_PORT,
        };

        let token_ttl = match get("JWT_EXPIRES_IN") {
            Some(v) => parse_ttl(&v).ok_or(ConfigError::Invalid {
                key: "JWT_EXPIRES_IN",
                value: v,
            })?,
            None => DEFAULT_TOKEN_TTL,
        };

        Ok(Self {
            port,
            database_path: get("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.into()),
            jwt_secret: get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            token_ttl,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
        })
    }
}

/// Parses a token lifetime: bare seconds (`900`) or a number with one of the
/// units `s`, `m`, `h`, `d` (`15m`, `1h`). Zero and anything longer than
/// [`MAX_TOKEN_TTL`] are rejected.
pub fn parse_ttl(value: &str) -> Option<Duration> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);
    let amount: u64 = digits.parse().ok()?;
    let scale = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return None,
    };
    match amount.checked_mul(scale)? {
        0 => None,
        secs if secs > MAX_TOKEN_TTL.as_secs() => None,
        secs => Some(Duration::from_secs(secs)),
    }
}
