//! Text-generation provider contract.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("generation provider is not configured: {0}")]
    NotConfigured(String),
    #[error("generation request failed: {0}")]
    Transport(String),
    #[error("generation provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generation provider response could not be decoded: {0}")]
    Envelope(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Provider-agnostic completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub temperature: f32,
    /// Ask the provider for a single JSON object rather than prose.
    pub json_output: bool,
    pub messages: Vec<ChatMessage>,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Return the raw text of the first completion.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GeneratorError>;
}
