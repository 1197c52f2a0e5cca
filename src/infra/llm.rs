//! Chat-completion client for OpenAI-compatible providers (Groq by default).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::generator::{
    ChatMessage, CompletionRequest, GeneratorError, TextGenerator,
};
use crate::config::GenerationSettings;

const LOG_TARGET: &str = "unsolved::generation";
const MAX_ERROR_BODY_CHARS: usize = 512;

pub struct OpenAiCompatibleGenerator {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleGenerator {
    pub fn new(
        api_base: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GeneratorError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| {
                GeneratorError::Transport(format!("failed to build HTTP client: {err}"))
            })?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            api_key: api_key
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
        })
    }

    pub fn from_settings(settings: &GenerationSettings) -> Result<Self, GeneratorError> {
        Self::new(
            settings.api_base.as_str(),
            settings.api_key.clone(),
            settings.request_timeout,
        )
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleGenerator {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GeneratorError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GeneratorError::NotConfigured(
                "generation.api_key is not set".to_string(),
            ));
        };

        let body = ChatRequest {
            model: &request.model,
            temperature: request.temperature,
            response_format: request
                .json_output
                .then_some(ResponseFormat { kind: "json_object" }),
            messages: &request.messages,
        };

        debug!(
            target: LOG_TARGET,
            endpoint = %self.endpoint,
            model = %request.model,
            "Requesting chat completion"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| GeneratorError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(GeneratorError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| GeneratorError::Envelope(err.to_string()))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    messages: &'a [ChatMessage],
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, Router, http::HeaderMap, http::StatusCode, routing::post};
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    use super::*;

    type Captured = Arc<Mutex<Option<(HeaderMap, Value)>>>;

    async fn serve(status: StatusCode, reply: Value) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let sink = Arc::clone(&captured);
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let sink = Arc::clone(&sink);
                let reply = reply.clone();
                async move {
                    *sink.lock().unwrap() = Some((headers, body));
                    (status, Json(reply))
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v1/"), captured)
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "llama-3.1-8b-instant".into(),
            temperature: 0.7,
            json_output: true,
            messages: vec![ChatMessage::system("json only"), ChatMessage::user("hello")],
        }
    }

    #[tokio::test]
    async fn posts_chat_request_and_returns_first_choice() {
        let (base, captured) = serve(
            StatusCode::OK,
            json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "{\"ok\":true}" } }
                ]
            }),
        )
        .await;
        let generator =
            OpenAiCompatibleGenerator::new(&base, Some("secret".into()), Duration::from_secs(5))
                .unwrap();

        let text = generator.complete(&request()).await.unwrap();
        assert_eq!(text, "{\"ok\":true}");

        let (headers, body) = captured.lock().unwrap().take().expect("request captured");
        assert_eq!(headers["authorization"], "Bearer secret");
        assert_eq!(body["model"], "llama-3.1-8b-instant");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let (base, _) = serve(StatusCode::TOO_MANY_REQUESTS, json!({ "error": "slow down" })).await;
        let generator =
            OpenAiCompatibleGenerator::new(&base, Some("secret".into()), Duration::from_secs(5))
                .unwrap();

        match generator.complete(&request()).await {
            Err(GeneratorError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert!(body.contains("slow down"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_choices_yield_empty_text() {
        let (base, _) = serve(StatusCode::OK, json!({ "choices": [] })).await;
        let generator =
            OpenAiCompatibleGenerator::new(&base, Some("secret".into()), Duration::from_secs(5))
                .unwrap();
        assert_eq!(generator.complete(&request()).await.unwrap(), "");
    }

    #[tokio::test]
    async fn missing_key_fails_without_a_request() {
        let generator = OpenAiCompatibleGenerator::new(
            "http://127.0.0.1:9/v1",
            Some("   ".into()),
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(matches!(
            generator.complete(&request()).await,
            Err(GeneratorError::NotConfigured(_))
        ));
    }
}
