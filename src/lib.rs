pub mod accounts;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod suggest;
pub mod todos;

use std::sync::Arc;

use axum::{
    routing::{patch, post},
    Router,
};
use tower_http::cors::CorsLayer;

use auth::TokenKeys;
use config::Config;
use db::DbPool;
use suggest::{OpenAiProvider, SuggestionGenerator};

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub keys: Arc<TokenKeys>,
    pub suggestions: Arc<SuggestionGenerator>,
}

impl AppState {
    /// Wires the SQLite store and the OpenAI-backed generator from `config`.
    pub fn from_config(config: &Config) -> rusqlite::Result<Self> {
        let db = db::init_db(&config.database_path)?;
        let provider = OpenAiProvider::new(&config.openai_base_url, config.openai_api_key.clone());
        Ok(Self {
            db,
            keys: Arc::new(TokenKeys::new(&config.jwt_secret, config.token_ttl)),
            suggestions: Arc::new(SuggestionGenerator::new(
                Arc::new(provider),
                config.openai_model.clone(),
            )),
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route(
            "/todos",
            post(handlers::todos::create_todo).get(handlers::todos::list_todos),
        )
        .route(
            "/todos/{id}",
            patch(handlers::todos::update_todo).delete(handlers::todos::delete_todo),
        )
        .route("/ai/suggest", post(handlers::ai::suggest))
        .layer(
            tower::ServiceBuilder::new()
                .layer(tower_http::trace::TraceLayer::new_for_http())
                .layer(tower_http::compression::CompressionLayer::new())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
