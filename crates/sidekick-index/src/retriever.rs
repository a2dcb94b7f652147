//! Query-time retrieval: embed the question, then run a repo-scoped similarity search.

use std::sync::Arc;

use sidekick_llm::{Embedder, LlmProvider};

use crate::error::Result;
use crate::store::{ChunkStore, SearchResult};

pub const DEFAULT_TOP_K: usize = 5;

pub struct Retriever<P: LlmProvider> {
    embedder: Embedder<P>,
    store: Arc<ChunkStore>,
    top_k: usize,
}

impl<P: LlmProvider> Retriever<P> {
    #[must_use]
    pub fn new(embedder: Embedder<P>, store: Arc<ChunkStore>, top_k: usize) -> Self {
        Self {
            embedder,
            store,
            top_k,
        }
    }

    /// Top-k chunks for `query`, best first.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding the query or searching the store fails.
    pub async fn retrieve(&self, query: &str, repo: Option<&str>) -> Result<Vec<SearchResult>> {
        let vector = self.embedder.embed(query).await?;
        let hits = self.store.query(vector, self.top_k, repo).await?;
        tracing::info!(repo = repo.unwrap_or("*"), hits = hits.len(), "retrieved context");
        Ok(hits)
    }
}
