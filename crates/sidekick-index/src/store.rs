//! Chunk-level adapter over a [`VectorStore`]: batched upsert, repo-scoped search
//! and repo-scoped purge.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sidekick_memory::{FieldCondition, VectorFilter, VectorPoint, VectorStore};

use crate::chunker::{Chunk, ChunkMetadata};
use crate::error::{IndexError, Result};

pub const DEFAULT_COLLECTION: &str = "sidekick_code_chunks";
pub const DEFAULT_BATCH_SIZE: usize = 50;

const REPO_FIELD: &str = "repoName";

/// A chunk paired with its embedding, ready for storage.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// One ranked hit from a scoped query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub score: f32,
    pub metadata: ChunkMetadata,
}

pub struct ChunkStore {
    store: Arc<dyn VectorStore>,
    collection: String,
    batch_size: usize,
}

impl std::fmt::Debug for ChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStore")
            .field("collection", &self.collection)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl ChunkStore {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, collection: impl Into<String>, batch_size: usize) -> Self {
        Self {
            store,
            collection: collection.into(),
            batch_size: batch_size.max(1),
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create the collection for `dimension`-sized vectors if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot create the collection.
    pub async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let size = u64::try_from(dimension).map_err(|e| IndexError::Other(e.to_string()))?;
        self.store.ensure_collection(&self.collection, size).await?;
        Ok(())
    }

    /// Upsert records in sequential batches. The first failing batch aborts the rest.
    ///
    /// # Errors
    ///
    /// Returns the backend error of the first failing batch.
    pub async fn upsert(&self, records: Vec<ChunkRecord>) -> Result<usize> {
        let total = records.len();
        let mut points = Vec::with_capacity(total);
        for record in records {
            points.push(to_point(record)?);
        }

        let batches = total.div_ceil(self.batch_size);
        let mut stored = 0;
        let mut iter = points.into_iter();
        for batch_no in 1..=batches {
            let batch: Vec<VectorPoint> = iter.by_ref().take(self.batch_size).collect();
            let len = batch.len();
            self.store.upsert(&self.collection, batch).await?;
            stored += len;
            tracing::debug!(batch = batch_no, batches, points = len, "upserted batch");
        }
        Ok(stored)
    }

    /// Nearest chunks to `vector`, optionally scoped to `repo` (matched as given or lowercased).
    ///
    /// Returns an empty list when nothing has been indexed yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend search fails.
    pub async fn query(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        repo: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        if !self.store.collection_exists(&self.collection).await? {
            return Ok(Vec::new());
        }
        let filter = repo.map(repo_filter);
        let limit = u64::try_from(top_k).unwrap_or(u64::MAX);
        let hits = self
            .store
            .search(&self.collection, vector, limit, filter)
            .await?;

        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                let payload = serde_json::Value::Object(hit.payload.into_iter().collect());
                match serde_json::from_value::<ChunkMetadata>(payload) {
                    Ok(metadata) => Some(SearchResult {
                        id: hit.id,
                        score: hit.score,
                        metadata,
                    }),
                    Err(e) => {
                        tracing::warn!(id = %hit.id, error = %e, "dropping hit with malformed payload");
                        None
                    }
                }
            })
            .collect())
    }

    /// Remove every vector stored for `repo`. Failures are logged, never returned.
    pub async fn delete_by_repo(&self, repo: &str) {
        tracing::info!(repo, "purging vectors for repo");
        if let Err(e) = self.purge(repo).await {
            tracing::error!(repo, error = %e, "failed to purge repo vectors");
        }
    }

    async fn purge(&self, repo: &str) -> Result<()> {
        if self.store.collection_exists(&self.collection).await? {
            self.store
                .delete_by_filter(&self.collection, repo_filter(repo))
                .await?;
        }
        Ok(())
    }
}

fn repo_filter(repo: &str) -> VectorFilter {
    let mut names = vec![repo.to_owned()];
    let lower = repo.to_lowercase();
    if lower != repo {
        names.push(lower);
    }
    VectorFilter {
        must: vec![FieldCondition::any_text(REPO_FIELD, names)],
    }
}

fn to_point(record: ChunkRecord) -> Result<VectorPoint> {
    let serde_json::Value::Object(map) = serde_json::to_value(&record.chunk.metadata)? else {
        return Err(IndexError::Other("chunk metadata is not an object".into()));
    };
    Ok(VectorPoint {
        id: record.chunk.id,
        vector: record.vector,
        payload: map.into_iter().collect(),
    })
}
