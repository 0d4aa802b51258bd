//! Task suggestions from a hosted text-completion model.
//!
//! The generator owns the prompt and the response contract: the model must
//! answer with `{"suggestions": [s1, s2, s3]}` and nothing else. Anything the
//! provider returns that does not fit that shape, and any transport failure,
//! is reported as [`AppError::Internal`] with the cause kept out of the
//! response body.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::AppError;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str = "You generate brief and practical task suggestions which are popular and useful nowadays. \
Return ONLY a JSON object: {\"suggestions\":[\"...\",\"...\",\"...\"]}. \
No commentary, no markdown. Exactly 3 items, each <= 80 chars.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider API key is not configured")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("provider response carried no output text")]
    EmptyOutput,
}

/// External completion endpoint. Returns the raw text the model produced.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, model: &str, messages: &[PromptMessage])
        -> Result<String, ProviderError>;
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("response is not valid JSON")]
    InvalidJson,
    #[error("`suggestions` field is missing or not an array")]
    MissingSuggestions,
    #[error("expected 3 suggestions, got {0}")]
    WrongCount(usize),
    #[error("suggestion {0} is not a string")]
    NotAString(usize),
}

/// Validates the model's answer and returns its three strings verbatim.
pub fn parse_suggestions(text: &str) -> Result<[String; 3], ShapeError> {
    let value: Value = serde_json::from_str(text).map_err(|_| ShapeError::InvalidJson)?;
    let items = value
        .get("suggestions")
        .and_then(Value::as_array)
        .ok_or(ShapeError::MissingSuggestions)?;
    if items.len() != 3 {
        return Err(ShapeError::WrongCount(items.len()));
    }

    let mut out: [String; 3] = Default::default();
    for (i, item) in items.iter().enumerate() {
        out[i] = item.as_str().ok_or(ShapeError::NotAString(i))?.to_string();
    }
    Ok(out)
}

pub fn build_prompt(input: &str) -> [PromptMessage; 2] {
    [
        PromptMessage {
            role: Role::System,
            content: SYSTEM_PROMPT.to_string(),
        },
        PromptMessage {
            role: Role::User,
            content: input.trim().to_string(),
        },
    ]
}

#[derive(Clone)]
pub struct SuggestionGenerator {
    provider: Arc<dyn CompletionProvider>,
    model: String,
}

impl SuggestionGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub async fn suggest(&self, input: &str) -> Result<[String; 3], AppError> {
        let prompt = build_prompt(input);
        let text = self
            .provider
            .complete(&self.model, &prompt)
            .await
            .map_err(|e| {
                error!(error = %e, model = %self.model, "completion request failed");
                AppError::Internal(format!("suggestion provider failed: {e}"))
            })?;
        debug!(len = text.len(), "completion received");

        parse_suggestions(&text).map_err(|e| {
            error!(error = %e, "completion had the wrong shape");
            AppError::Internal(format!("suggestion response rejected: {e}"))
        })
    }
}

/// Calls the OpenAI Responses API.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a [PromptMessage],
}

impl OpenAiProvider {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

/// Pulls the generated text out of a Responses API payload: the
/// `output_text` convenience field when present, otherwise every
/// `output_text` content part in order.
fn output_text(payload: &Value) -> Option<String> {
    if let Some(text) = payload.get("output_text").and_then(Value::as_str) {
        return Some(text.to_string());
    }

    let mut text = String::new();
    let mut found = false;
    for item in payload.get("output")?.as_array()? {
        let Some(parts) = item.get("content").and_then(Value::as_array) else {
            continue;
        };
        for part in parts {
            if part.get("type").and_then(Value::as_str) == Some("output_text") {
                if let Some(t) = part.get("text").and_then(Value::as_str) {
                    text.push_str(t);
                    found = true;
                }
            }
        }
    }
    found.then_some(text)
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(
        &self,
        model: &str,
        messages: &[PromptMessage],
    ) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;

        let resp = self
            .client
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(api_key)
            .json(&ResponsesRequest {
                model,
                input: messages,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = resp.json().await?;
        output_text(&payload).ok_or(ProviderError::EmptyOutput)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    /// Replays a canned answer and records what it was asked.
    struct CannedProvider {
        answer: Result<String, ()>,
        calls: Mutex<Vec<(String, Vec<PromptMessage>)>>,
    }

    impl CannedProvider {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(text.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                answer: Err(()),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionProvider for CannedProvider {
        async fn complete(
            &self,
            model: &str,
            messages: &[PromptMessage],
        ) -> Result<String, ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), messages.to_vec()));
            self.answer.clone().map_err(|_| ProviderError::EmptyOutput)
        }
    }

    #[test]
    fn parse_accepts_three_strings() {
        let out = parse_suggestions(r#"{"suggestions":["a","b","c"]}"#).unwrap();
        assert_eq!(out, ["a", "b", "c"]);
    }

    #[test]
    fn parse_keeps_content_verbatim() {
        let out = parse_suggestions(r#"{"suggestions":["  padded ","","x"], "extra": 1}"#).unwrap();
        assert_eq!(out, ["  padded ", "", "x"]);
    }

    #[test]
    fn parse_rejects_bad_shapes() {
        assert_eq!(parse_suggestions("not-json"), Err(ShapeError::InvalidJson));
        assert_eq!(parse_suggestions("{}"), Err(ShapeError::MissingSuggestions));
        assert_eq!(
            parse_suggestions(r#"{"suggestions":"a,b,c"}"#),
            Err(ShapeError::MissingSuggestions)
        );
        assert_eq!(
            parse_suggestions(r#"{"suggestions":["only","two"]}"#),
            Err(ShapeError::WrongCount(2))
        );
        assert_eq!(
            parse_suggestions(r#"{"suggestions":["a","b","c","d"]}"#),
            Err(ShapeError::WrongCount(4))
        );
        assert_eq!(
            parse_suggestions(r#"{"suggestions":["a",2,"c"]}"#),
            Err(ShapeError::NotAString(1))
        );
    }

    #[tokio::test]
    async fn generator_sends_trimmed_input_and_model() {
        let provider = CannedProvider::ok(r#"{"suggestions":["one","two","three"]}"#);
        let generator = SuggestionGenerator::new(provider.clone(), "unit-test-model");

        let out = generator.suggest("   something to suggest   ").await.unwrap();
        assert_eq!(out, ["one", "two", "three"]);

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (model, messages) = &calls[0];
        assert_eq!(model, "unit-test-model");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("Exactly 3 items"));
        assert_eq!(
            messages[1],
            PromptMessage {
                role: Role::User,
                content: "something to suggest".into()
            }
        );
    }

    #[tokio::test]
    async fn generator_hides_failures_as_internal() {
        for text in ["not-json", r#"{"suggestions":["a","b"]}"#, r#"{"suggestions":[1,2,3]}"#] {
            let generator = SuggestionGenerator::new(CannedProvider::ok(text), DEFAULT_MODEL);
            assert!(matches!(generator.suggest("x").await, Err(AppError::Internal(_))));
        }

        let generator = SuggestionGenerator::new(CannedProvider::failing(), DEFAULT_MODEL);
        assert!(matches!(generator.suggest("x").await, Err(AppError::Internal(_))));
    }

    #[test]
    fn output_text_prefers_convenience_field() {
        let payload = json!({ "output_text": "direct", "output": [] });
        assert_eq!(output_text(&payload).as_deref(), Some("direct"));
    }

    #[test]
    fn output_text_joins_message_parts() {
        let payload = json!({
            "output": [
                { "type": "reasoning", "summary": [] },
                { "type": "message", "role": "assistant", "content": [
                    { "type": "output_text", "text": "{\"suggestions\":" },
                    { "type": "refusal", "refusal": "no" },
                    { "type": "output_text", "text": "[\"a\",\"b\",\"c\"]}" }
                ]}
            ]
        });
        assert_eq!(
            output_text(&payload).as_deref(),
            Some(r#"{"suggestions":["a","b","c"]}"#)
        );
        assert_eq!(output_text(&json!({ "output": [] })), None);
        assert_eq!(output_text(&json!({})), None);
    }

    #[tokio::test]
    async fn openai_provider_posts_to_responses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "gpt-test" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "output": [{ "type": "message", "content": [
                    { "type": "output_text", "text": "{\"suggestions\":[\"a\",\"b\",\"c\"]}" }
                ]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(&format!("{}/", server.uri()), Some("sk-test".into()));
        let generator = SuggestionGenerator::new(Arc::new(provider), "gpt-test");
        let out = generator.suggest("plan a trip").await.unwrap();
        assert_eq!(out, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn openai_provider_reports_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(&server.uri(), Some("sk-test".into()));
        let err = provider
            .complete("gpt-test", &build_prompt("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 429, .. }));
    }

    #[tokio::test]
    async fn openai_provider_requires_api_key() {
        let provider = OpenAiProvider::new(DEFAULT_BASE_URL, None);
        let err = provider
            .complete(DEFAULT_MODEL, &build_prompt("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey));
    }
}
