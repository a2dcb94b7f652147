//! Embedding client: text to vector with rate-limit backoff.

use std::sync::Arc;

use crate::error::LlmError;
use crate::provider::LlmProvider;
use crate::retry::{RetryPolicy, retry_on_rate_limit};

pub struct Embedder<P: LlmProvider> {
    provider: Arc<P>,
    policy: RetryPolicy,
}

impl<P: LlmProvider> Clone for Embedder<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            policy: self.policy,
        }
    }
}

impl<P: LlmProvider> std::fmt::Debug for Embedder<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("provider", &self.provider.name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl<P: LlmProvider> Embedder<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Embed `text`, retrying on rate limits according to the configured policy.
    ///
    /// # Errors
    ///
    /// Returns the provider error once retries are exhausted or on any non-rate-limit failure.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        if !self.provider.supports_embeddings() {
            return Err(LlmError::EmbedUnsupported {
                provider: self.provider.name().to_owned(),
            });
        }
        retry_on_rate_limit(&self.policy, "embed", || self.provider.embed(text)).await
    }
}
