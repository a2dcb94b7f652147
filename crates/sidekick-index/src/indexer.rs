//! Repository indexing orchestrator: walk → chunk → embed → store.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sidekick_llm::{Embedder, LlmProvider};

use crate::chunker::{ChunkerConfig, chunk_file};
use crate::error::Result;
use crate::repo::{code_files, read_file};
use crate::store::{ChunkRecord, ChunkStore};

/// Indexer configuration.
#[derive(Debug, Clone, Copy)]
pub struct IndexerConfig {
    pub chunker: ChunkerConfig,
    /// Only the first `max_files` code files (sorted by path) are indexed.
    pub max_files: usize,
    /// Pause after each successful embedding call.
    pub embed_delay: Duration,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            max_files: 50,
            embed_delay: Duration::from_millis(100),
        }
    }
}

/// Summary of an indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexReport {
    pub repo_name: String,
    pub files_found: usize,
    pub files_indexed: usize,
    pub chunks_created: usize,
    pub chunks_embedded: usize,
    pub chunks_failed: usize,
    pub vectors_stored: usize,
    pub duration_ms: u64,
}

pub struct RepoIndexer<P: LlmProvider> {
    embedder: Embedder<P>,
    store: Arc<ChunkStore>,
    config: IndexerConfig,
}

impl<P: LlmProvider> RepoIndexer<P> {
    #[must_use]
    pub fn new(embedder: Embedder<P>, store: Arc<ChunkStore>, config: IndexerConfig) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Chunk, embed and store the code files of a local clone.
    ///
    /// A chunk whose embedding fails is logged and skipped; the run continues.
    ///
    /// # Errors
    ///
    /// Returns an error if collection creation or a batch upsert fails.
    pub async fn index_repository(&self, repo_name: &str, root: &Path) -> Result<IndexReport> {
        let start = Instant::now();
        let files = code_files(root);
        let mut report = IndexReport {
            repo_name: repo_name.to_owned(),
            files_found: files.len(),
            ..IndexReport::default()
        };

        let selected = files.len().min(self.config.max_files);
        tracing::info!(repo = %repo_name, found = files.len(), selected, "indexing started");

        let mut records = Vec::new();
        for (i, rel) in files.iter().take(self.config.max_files).enumerate() {
            let content = match read_file(root, rel).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(file = %rel, error = %e, "skipping unreadable file");
                    continue;
                }
            };

            let chunks = chunk_file(repo_name, rel, &content, &self.config.chunker);
            report.chunks_created += chunks.len();
            if !chunks.is_empty() {
                report.files_indexed += 1;
            }

            for chunk in chunks {
                match self.embedder.embed(&chunk.content).await {
                    Ok(vector) => {
                        report.chunks_embedded += 1;
                        records.push(ChunkRecord { chunk, vector });
                        if !self.config.embed_delay.is_zero() {
                            tokio::time::sleep(self.config.embed_delay).await;
                        }
                    }
                    Err(e) => {
                        report.chunks_failed += 1;
                        tracing::warn!(chunk = %chunk.id, error = %e, "embedding failed, skipping chunk");
                    }
                }
            }

            tracing::debug!(
                file = %rel,
                progress = format_args!("{}/{selected}", i + 1),
                embedded = report.chunks_embedded,
            );
        }

        if let Some(first) = records.first() {
            self.store.ensure_collection(first.vector.len()).await?;
            report.vectors_stored = self.store.upsert(records).await?;
        }

        report.duration_ms = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        tracing::info!(
            repo = %repo_name,
            chunks = report.chunks_created,
            stored = report.vectors_stored,
            failed = report.chunks_failed,
            duration_ms = report.duration_ms,
            "indexing finished"
        );
        Ok(report)
    }
}
