use super::Config;
use crate::secret::Secret;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_llm();
        self.apply_env_overrides_pipeline();
    }

    fn apply_env_overrides_llm(&mut self) {
        if let Ok(v) = std::env::var("SIDEKICK_LLM_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid SIDEKICK_LLM_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("SIDEKICK_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("SIDEKICK_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("SIDEKICK_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("SIDEKICK_GEMINI_MODEL") {
            self.llm.gemini.get_or_insert_default().model = v;
        }
        if let Ok(v) = std::env::var("SIDEKICK_GEMINI_EMBEDDING_MODEL") {
            self.llm.gemini.get_or_insert_default().embedding_model = v;
        }
    }

    fn apply_env_overrides_pipeline(&mut self) {
        if let Ok(v) = std::env::var("SIDEKICK_VECTOR_BACKEND") {
            if let Ok(backend) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.vector_store.backend = backend;
            } else {
                tracing::warn!("ignoring invalid SIDEKICK_VECTOR_BACKEND value: {v}");
            }
        }
        if let Ok(v) = std::env::var("SIDEKICK_QDRANT_URL") {
            self.vector_store.qdrant_url = v;
        }
        if let Ok(v) = std::env::var("SIDEKICK_COLLECTION") {
            self.vector_store.collection = v;
        }
        if let Ok(v) = std::env::var("SIDEKICK_INDEX_MAX_FILES")
            && let Ok(n) = v.parse::<usize>()
        {
            self.index.max_files = n;
        }
        if let Ok(v) = std::env::var("SIDEKICK_INDEX_EMBED_DELAY_MS")
            && let Ok(ms) = v.parse::<u64>()
        {
            self.index.embed_delay_ms = ms;
        }
        if let Ok(v) = std::env::var("SIDEKICK_RETRIEVAL_TOP_K")
            && let Ok(k) = v.parse::<usize>()
        {
            self.retrieval.top_k = k;
        }
        if let Ok(v) = std::env::var("SIDEKICK_RETRY_MAX_ATTEMPTS")
            && let Ok(n) = v.parse::<u32>()
        {
            self.retry.max_attempts = n;
        }
        if let Ok(v) = std::env::var("SIDEKICK_RETRY_INITIAL_DELAY_MS")
            && let Ok(ms) = v.parse::<u64>()
        {
            self.retry.initial_delay_ms = ms;
        }
        if let Ok(v) = std::env::var("SIDEKICK_REPO_DIR") {
            self.storage.repo_dir = v;
        }
    }

    pub(crate) fn resolve_secrets(&mut self) {
        if let Ok(v) = std::env::var("SIDEKICK_OPENAI_API_KEY")
            && !v.is_empty()
        {
            self.secrets.openai_api_key = Some(Secret::new(v));
        }
        if let Ok(v) = std::env::var("SIDEKICK_GEMINI_API_KEY")
            && !v.is_empty()
        {
            self.secrets.gemini_api_key = Some(Secret::new(v));
        }
    }
}
