//! LLM provider abstraction, backend implementations, and rate-limit retry.

pub mod any;
pub mod embedder;
pub mod error;
pub mod gemini;
pub(crate) mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod retry;

pub use embedder::Embedder;
pub use error::{LlmError, Result};
pub use provider::LlmProvider;
pub use retry::{RetryPolicy, retry_on_rate_limit};
