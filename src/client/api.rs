use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::models::{
    CreateTodo, DeletedTodo, LoginRequest, LoginResponse, RegisterRequest, RegisteredUser,
    SuggestRequest, SuggestResponse, Todo, UpdateTodo, UpdatedTodo,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Network(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

/// HTTP client for the todo API. Sends the bearer token when one is set.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let req = match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: extract_error(&body)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string()),
            });
        }

        Ok(resp.json::<T>().await?)
    }

    // ── Auth ────────────────────────────────────────────────────────────

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<RegisteredUser, ClientError> {
        let body = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            display_name: display_name.map(str::to_string),
        };
        self.send(self.client.post(self.url("/auth/register")).json(&body))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send(self.client.post(self.url("/auth/login")).json(&body))
            .await
    }

    // ── Todos ───────────────────────────────────────────────────────────

    pub async fn list_todos(&self) -> Result<Vec<Todo>, ClientError> {
        self.send(self.client.get(self.url("/todos"))).await
    }

    pub async fn create_todo(&self, body: &str) -> Result<Todo, ClientError> {
        let body = CreateTodo {
            body: body.to_string(),
        };
        self.send(self.client.post(self.url("/todos")).json(&body))
            .await
    }

    pub async fn update_todo(&self, id: Uuid, patch: &UpdateTodo) -> Result<UpdatedTodo, ClientError> {
        self.send(
            self.client
                .patch(self.url(&format!("/todos/{id}")))
                .json(patch),
        )
        .await
    }

    pub async fn delete_todo(&self, id: Uuid) -> Result<DeletedTodo, ClientError> {
        self.send(self.client.delete(self.url(&format!("/todos/{id}"))))
            .await
    }

    // ── Suggestions ─────────────────────────────────────────────────────

    pub async fn suggest(&self, input: &str) -> Result<SuggestResponse, ClientError> {
        let body = SuggestRequest {
            input: input.to_string(),
        };
        self.send(self.client.post(self.url("/ai/suggest")).json(&body))
            .await
    }
}

/// Pulls the reason out of an `{"error": "..."}` body, falling back to the
/// raw text.
fn extract_error(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(msg) = value.get("error").and_then(|v| v.as_str()) {
            return Some(msg.to_string());
        }
    }
    let body = body.trim();
    (!body.is_empty()).then(|| body.to_string())
}
