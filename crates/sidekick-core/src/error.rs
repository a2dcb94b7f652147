use sidekick_index::IndexError;
use sidekick_llm::LlmError;
use sidekick_memory::VectorStoreError;

#[derive(Debug, thiserror::Error)]
pub enum SidekickError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),
}

impl SidekickError {
    /// Whether the failure means a repository or file does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Index(IndexError::NotFound(_)))
    }
}

pub type Result<T> = std::result::Result<T, SidekickError>;
