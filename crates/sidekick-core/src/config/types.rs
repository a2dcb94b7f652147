use std::time::Duration;

use serde::{Deserialize, Serialize};
use sidekick_index::chunker::ChunkerConfig;
use sidekick_index::complexity::ComplexityConfig;
use sidekick_index::indexer::IndexerConfig;
use sidekick_llm::RetryPolicy;

use crate::secret::Secret;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

/// API keys read from the environment only, never from the config file.
#[derive(Debug, Default)]
pub struct ResolvedSecrets {
    pub openai_api_key: Option<Secret>,
    pub gemini_api_key: Option<Secret>,
}

/// LLM provider backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ollama,
    OpenAi,
    Gemini,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}

fn default_model() -> String {
    "llama3.1:8b".into()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".into()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    /// Ollama endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai: Option<OpenAiConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini: Option<GeminiConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: default_base_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            openai: None,
            gemini: None,
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".into()
}

fn default_max_tokens() -> u32 {
    4096
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_gemini_base_url() -> String {
    sidekick_llm::gemini::DEFAULT_BASE_URL.into()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".into()
}

fn default_gemini_embedding_model() -> String {
    "text-embedding-004".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_embedding_model")]
    pub embedding_model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
            embedding_model: default_gemini_embedding_model(),
        }
    }
}

/// Vector database backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    #[default]
    Qdrant,
    Memory,
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".into()
}

fn default_collection() -> String {
    sidekick_index::store::DEFAULT_COLLECTION.into()
}

fn default_batch_size() -> usize {
    sidekick_index::store::DEFAULT_BATCH_SIZE
}

#[derive(Debug, Deserialize, Serialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub backend: VectorBackend,
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::default(),
            qdrant_url: default_qdrant_url(),
            collection: default_collection(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_chunk_lines() -> usize {
    50
}

fn default_overlap_lines() -> usize {
    10
}

fn default_min_chunk_lines() -> usize {
    5
}

fn default_max_files() -> usize {
    50
}

fn default_embed_delay_ms() -> u64 {
    100
}

#[derive(Debug, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default = "default_chunk_lines")]
    pub chunk_lines: usize,
    #[serde(default = "default_overlap_lines")]
    pub overlap_lines: usize,
    #[serde(default = "default_min_chunk_lines")]
    pub min_chunk_lines: usize,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default = "default_embed_delay_ms")]
    pub embed_delay_ms: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            chunk_lines: default_chunk_lines(),
            overlap_lines: default_overlap_lines(),
            min_chunk_lines: default_min_chunk_lines(),
            max_files: default_max_files(),
            embed_delay_ms: default_embed_delay_ms(),
        }
    }
}

impl IndexConfig {
    #[must_use]
    pub fn indexer_config(&self) -> IndexerConfig {
        IndexerConfig {
            chunker: ChunkerConfig {
                window_lines: self.chunk_lines,
                overlap_lines: self.overlap_lines,
                min_lines: self.min_chunk_lines,
            },
            max_files: self.max_files,
            embed_delay: Duration::from_millis(self.embed_delay_ms),
        }
    }
}

fn default_top_k() -> usize {
    sidekick_index::retriever::DEFAULT_TOP_K
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    2000
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_delay_ms),
        )
    }
}

fn default_complexity_top_n() -> usize {
    20
}

fn default_top_complex_files() -> usize {
    10
}

fn default_commit_days() -> usize {
    30
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AnalyticsConfig {
    /// Number of largest files that get a complexity score.
    #[serde(default = "default_complexity_top_n")]
    pub complexity_top_n: usize,
    #[serde(default = "default_top_complex_files")]
    pub top_complex_files: usize,
    #[serde(default = "default_commit_days")]
    pub commit_days: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            complexity_top_n: default_complexity_top_n(),
            top_complex_files: default_top_complex_files(),
            commit_days: default_commit_days(),
        }
    }
}

impl AnalyticsConfig {
    #[must_use]
    pub fn analytics_config(&self) -> sidekick_index::analytics::AnalyticsConfig {
        sidekick_index::analytics::AnalyticsConfig {
            complexity: ComplexityConfig {
                score_top_n: self.complexity_top_n,
                report_top: self.top_complex_files,
            },
            commit_days: self.commit_days,
        }
    }
}

fn default_repo_dir() -> String {
    "./data/repos".into()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding one clone per repository name.
    #[serde(default = "default_repo_dir")]
    pub repo_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            repo_dir: default_repo_dir(),
        }
    }
}
