//! Google Gemini REST backend (`generateContent` / `embedContent`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message, Role};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    embedding_model: String,
}

impl fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

impl GeminiProvider {
    #[must_use]
    pub fn new(
        api_key: String,
        mut base_url: String,
        model: String,
        embedding_model: String,
    ) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: crate::http::default_client(),
            api_key,
            base_url,
            model,
            embedding_model,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn call<B: Serialize>(
        &self,
        model: &str,
        method: &str,
        body: &B,
    ) -> Result<String, LlmError> {
        let response = self
            .client
            .post(format!("{}/models/{model}:{method}", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.map_err(LlmError::Http)?;

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || (!status.is_success() && text.contains("RESOURCE_EXHAUSTED"))
        {
            return Err(LlmError::RateLimited);
        }

        if !status.is_success() {
            tracing::error!("Gemini API error {status} on {method}: {text}");
            return Err(LlmError::Other(format!(
                "Gemini {method} request failed (status {status})"
            )));
        }

        Ok(text)
    }
}

impl LlmProvider for GeminiProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let body = build_generate_request(messages);
        let text = self.call(&self.model, "generateContent", &body).await?;
        let resp: GenerateResponse = serde_json::from_str(&text)?;

        let answer: String = resp
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if answer.is_empty() {
            return Err(LlmError::EmptyResponse { provider: "gemini" });
        }
        Ok(answer)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let model_ref = format!("models/{}", self.embedding_model);
        let body = EmbedRequest {
            model: &model_ref,
            content: Content {
                role: None,
                parts: vec![Part {
                    text: Some(text.to_owned()),
                }],
            },
        };

        let text = self.call(&self.embedding_model, "embedContent", &body).await?;
        let resp: EmbedResponse = serde_json::from_str(&text)?;

        if resp.embedding.values.is_empty() {
            return Err(LlmError::EmptyResponse { provider: "gemini" });
        }
        Ok(resp.embedding.values)
    }

    fn supports_embeddings(&self) -> bool {
        true
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "gemini"
    }
}

/// System messages become `systemInstruction`; assistant turns use the `model` role.
fn build_generate_request(messages: &[Message]) -> GenerateRequest {
    let system: Vec<Part> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| Part {
            text: Some(m.content.clone()),
        })
        .collect();

    let contents = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| Content {
            role: Some(if m.role == Role::Assistant { "model" } else { "user" }),
            parts: vec![Part {
                text: Some(m.content.clone()),
            }],
        })
        .collect();

    GenerateRequest {
        contents,
        system_instruction: (!system.is_empty()).then_some(Content {
            role: None,
            parts: system,
        }),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none", skip_deserializing)]
    role: Option<&'static str>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}
