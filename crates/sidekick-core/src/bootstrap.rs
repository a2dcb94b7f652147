//! Provider and vector store construction from [`Config`].

use std::sync::Arc;

use anyhow::Context;
use sidekick_llm::any::AnyProvider;
use sidekick_llm::gemini::GeminiProvider;
use sidekick_llm::ollama::OllamaProvider;
use sidekick_llm::openai::OpenAiProvider;
use sidekick_memory::{InMemoryVectorStore, QdrantOps, VectorStore};

use crate::config::{Config, ProviderKind, VectorBackend};

/// Build the configured LLM provider.
///
/// # Errors
///
/// Returns an error if a cloud provider is selected without its API key, or OpenAI
/// is selected without an `[llm.openai]` section.
pub fn create_provider(config: &Config) -> anyhow::Result<AnyProvider> {
    match config.llm.provider {
        ProviderKind::Ollama => Ok(AnyProvider::Ollama(OllamaProvider::new(
            &config.llm.base_url,
            config.llm.model.clone(),
            config.llm.embedding_model.clone(),
        ))),
        ProviderKind::OpenAi => {
            let openai_cfg = config
                .llm
                .openai
                .as_ref()
                .context("llm.openai config section required for OpenAI provider")?;
            let api_key = config
                .secrets
                .openai_api_key
                .as_ref()
                .context("SIDEKICK_OPENAI_API_KEY not set")?
                .expose()
                .to_owned();
            Ok(AnyProvider::OpenAi(OpenAiProvider::new(
                api_key,
                openai_cfg.base_url.clone(),
                openai_cfg.model.clone(),
                openai_cfg.max_tokens,
                openai_cfg.embedding_model.clone(),
            )))
        }
        ProviderKind::Gemini => {
            let gemini_cfg = config.llm.gemini.clone().unwrap_or_default();
            let api_key = config
                .secrets
                .gemini_api_key
                .as_ref()
                .context("SIDEKICK_GEMINI_API_KEY not set")?
                .expose()
                .to_owned();
            Ok(AnyProvider::Gemini(GeminiProvider::new(
                api_key,
                gemini_cfg.base_url,
                gemini_cfg.model,
                gemini_cfg.embedding_model,
            )))
        }
    }
}

/// Build the configured vector store backend.
///
/// # Errors
///
/// Returns an error if the Qdrant client cannot be created.
pub fn create_vector_store(config: &Config) -> anyhow::Result<Arc<dyn VectorStore>> {
    match config.vector_store.backend {
        VectorBackend::Qdrant => {
            let ops = QdrantOps::new(&config.vector_store.qdrant_url)
                .map_err(|e| anyhow::anyhow!("{e}"))
                .with_context(|| {
                    format!(
                        "failed to create qdrant client for {}",
                        config.vector_store.qdrant_url
                    )
                })?;
            tracing::info!(url = %config.vector_store.qdrant_url, "using qdrant vector store");
            Ok(Arc::new(ops))
        }
        VectorBackend::Memory => {
            tracing::warn!(
                "using in-memory vector store; vectors are lost when this process exits"
            );
            Ok(Arc::new(InMemoryVectorStore::new()))
        }
    }
}

/// Log whether the provider is reachable. Never fails.
pub async fn health_check(provider: &AnyProvider) {
    if let AnyProvider::Ollama(ollama) = provider {
        match ollama.health_check().await {
            Ok(()) => tracing::info!("ollama health check passed"),
            Err(e) => tracing::warn!("ollama health check failed: {e:#}"),
        }
    }
}
