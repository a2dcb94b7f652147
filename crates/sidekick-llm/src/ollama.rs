//! Local Ollama backend for chat and embeddings.

use ollama_rs::Ollama;
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message, Role};

const DEFAULT_PORT: u16 = 11434;

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Ollama,
    model: String,
    embedding_model: String,
}

impl OllamaProvider {
    #[must_use]
    pub fn new(base_url: &str, model: String, embedding_model: String) -> Self {
        let (host, port) = split_base_url(base_url);
        Self {
            client: Ollama::new(host, port),
            model,
            embedding_model,
        }
    }

    /// Verify the server answers and warn about models that have not been pulled.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached.
    pub async fn health_check(&self) -> Result<(), LlmError> {
        let models = self.client.list_local_models().await.map_err(|e| {
            LlmError::Other(format!("failed to connect to Ollama, is it running? {e}"))
        })?;
        let pulled: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        for wanted in [&self.model, &self.embedding_model] {
            if !has_model(&pulled, wanted) {
                tracing::warn!(model = %wanted, "ollama model not pulled");
            }
        }
        Ok(())
    }
}

impl LlmProvider for OllamaProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let history: Vec<ChatMessage> = messages.iter().map(to_chat_message).collect();
        let request = ChatMessageRequest::new(self.model.clone(), history);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| request_error("chat", &e))?;

        let content = response.message.content;
        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse { provider: "ollama" });
        }
        tracing::debug!(model = %self.model, len = content.len(), "ollama chat completed");
        Ok(content)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let request = GenerateEmbeddingsRequest::new(
            self.embedding_model.clone(),
            EmbeddingsInput::from(text),
        );

        let response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| request_error("embedding", &e))?;

        response
            .embeddings
            .into_iter()
            .find(|v| !v.is_empty())
            .ok_or(LlmError::EmptyResponse { provider: "ollama" })
    }

    fn supports_embeddings(&self) -> bool {
        true
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ollama"
    }
}

fn to_chat_message(msg: &Message) -> ChatMessage {
    let content = msg.content.clone();
    match msg.role {
        Role::System => ChatMessage::system(content),
        Role::User => ChatMessage::user(content),
        Role::Assistant => ChatMessage::assistant(content),
    }
}

fn request_error(kind: &str, err: &impl std::fmt::Display) -> LlmError {
    let text = err.to_string();
    if is_throttled(&text) {
        return LlmError::RateLimited;
    }
    LlmError::Other(format!("Ollama {kind} request failed: {text}"))
}

/// Recognizes an HTTP 429 status, never a bare `429` inside a URL or model tag.
fn is_throttled(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains("too many requests")
        || ["status 429", "status: 429", "status code 429", "status code: 429"]
            .iter()
            .any(|marker| {
                lower.match_indices(marker).any(|(i, m)| {
                    !lower[i + m.len()..].starts_with(|c: char| c.is_ascii_digit())
                })
            })
}

/// `nomic-embed-text` matches a pulled `nomic-embed-text:latest`.
fn has_model(pulled: &[&str], wanted: &str) -> bool {
    pulled
        .iter()
        .any(|name| *name == wanted || name.split(':').next() == Some(wanted))
}

fn split_base_url(url: &str) -> (String, u16) {
    let url = url.trim_end_matches('/');
    if let Some((host, port)) = url.rsplit_once(':')
        && let Ok(port) = port.parse::<u16>()
    {
        return (host.to_owned(), port);
    }
    (url.to_owned(), DEFAULT_PORT)
}
