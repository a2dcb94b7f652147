//! Error types for sidekick-index.

/// Errors that can occur while fetching, analysing or indexing a repository.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// IO error reading source files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider error (embedding).
    #[error("LLM error: {0}")]
    Llm(#[from] sidekick_llm::LlmError),

    /// Vector store error.
    #[error("vector store error: {0}")]
    VectorStore(#[from] sidekick_memory::VectorStoreError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing repository clone or file.
    #[error("not found: {0}")]
    NotFound(String),

    /// A git command exited unsuccessfully.
    #[error("git {command} failed: {stderr}")]
    Git { command: &'static str, stderr: String },

    /// Repository URL that does not yield a usable name.
    #[error("invalid repository url: {0}")]
    InvalidUrl(String),

    /// Relative path that escapes the repository root.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
