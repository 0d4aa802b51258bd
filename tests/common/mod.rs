#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use todo_api::auth::TokenKeys;
use todo_api::suggest::{
    CompletionProvider, PromptMessage, ProviderError, SuggestionGenerator,
};
use todo_api::{create_app, db, AppState};

pub const SECRET: &str = "integration-secret";

/// Echoes the user's prompt back as three suggestions.
pub struct EchoProvider;

#[async_trait]
impl CompletionProvider for EchoProvider {
    async fn complete(
        &self,
        _model: &str,
        messages: &[PromptMessage],
    ) -> Result<String, ProviderError> {
        let input = &messages[1].content;
        Ok(json!({
            "suggestions": [
                format!("Try: {input} #1"),
                format!("Try: {input} #2"),
                format!("Try: {input} #3"),
            ]
        })
        .to_string())
    }
}

/// Always answers with the given text.
pub struct FixedProvider(pub &'static str);

#[async_trait]
impl CompletionProvider for FixedProvider {
    async fn complete(&self, _: &str, _: &[PromptMessage]) -> Result<String, ProviderError> {
        Ok(self.0.to_string())
    }
}

/// Always fails like an upstream outage.
pub struct DownProvider;

#[async_trait]
impl CompletionProvider for DownProvider {
    async fn complete(&self, _: &str, _: &[PromptMessage]) -> Result<String, ProviderError> {
        Err(ProviderError::Status {
            status: 503,
            body: "upstream secret detail".into(),
        })
    }
}

pub struct TestServer {
    pub addr: String,
    pub client: Client,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::with_provider(Arc::new(EchoProvider)).await
    }

    pub async fn with_provider(provider: Arc<dyn CompletionProvider>) -> Self {
        let db = db::init_in_memory().expect("Failed to create in-memory database");
        let state = AppState {
            db,
            keys: Arc::new(TokenKeys::new(SECRET, Duration::from_secs(15 * 60))),
            suggestions: Arc::new(SuggestionGenerator::new(provider, "test-model")),
        };
        let app = create_app(state);

        // Bind to random available port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestServer {
            addr,
            client: Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    pub async fn register(&self, email: &str, password: &str) -> Value {
        let resp = self
            .client
            .post(self.url("/auth/register"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
        resp.json().await.unwrap()
    }

    /// Registers `email` and returns an access token for it.
    pub async fn token_for(&self, email: &str) -> String {
        self.register(email, "secret123").await;
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": "secret123" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        body["accessToken"].as_str().unwrap().to_string()
    }
}
