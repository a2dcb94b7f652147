//! [`Sidekick`]: the ready-to-use handle tying fetching, indexing, retrieval,
//! synthesis and analysis together.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sidekick_index::analytics::{self, AnalyticsReport};
use sidekick_index::dependency::{self, DependencyGraph};
use sidekick_index::indexer::{IndexReport, RepoIndexer};
use sidekick_index::repo::{RepoFetcher, list_files, read_file};
use sidekick_index::retriever::Retriever;
use sidekick_index::store::{ChunkStore, SearchResult};
use sidekick_llm::any::AnyProvider;
use sidekick_llm::{Embedder, LlmProvider};
use sidekick_memory::VectorStore;

use crate::bootstrap::{create_provider, create_vector_store, health_check};
use crate::config::Config;
use crate::diagram::{self, DiagramKind};
use crate::error::Result;
use crate::synthesizer::{DocSection, Synthesizer, error_analysis_query};

/// One retrieved chunk as shown next to an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub filename: String,
    pub score: f32,
    pub start_line: usize,
    pub end_line: usize,
    pub code: String,
}

impl From<&SearchResult> for Source {
    fn from(hit: &SearchResult) -> Self {
        Self {
            filename: hit.metadata.filename.clone(),
            score: hit.score,
            start_line: hit.metadata.start_line,
            end_line: hit.metadata.end_line,
            code: hit.metadata.content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<Source>,
}

pub struct Sidekick<P: LlmProvider> {
    fetcher: RepoFetcher,
    store: Arc<ChunkStore>,
    indexer: RepoIndexer<P>,
    retriever: Retriever<P>,
    synthesizer: Synthesizer<P>,
    analytics: analytics::AnalyticsConfig,
}

impl Sidekick<AnyProvider> {
    /// Build the provider and vector store named in `config` and prepare the storage directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid, a provider cannot be built, or the
    /// storage directory cannot be created.
    pub async fn init(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;
        let provider = create_provider(config)?;
        health_check(&provider).await;
        let vector_store = create_vector_store(config)?;
        let sidekick = Self::with_parts(config, Arc::new(provider), vector_store).await?;
        tracing::info!(
            provider = %config.llm.provider,
            repo_dir = %config.storage.repo_dir,
            "sidekick initialized"
        );
        Ok(sidekick)
    }
}

impl<P: LlmProvider> Sidekick<P> {
    /// Assemble a handle from an explicit provider and vector store.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage directory cannot be created.
    pub async fn with_parts(
        config: &Config,
        provider: Arc<P>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        let fetcher = RepoFetcher::new(config.repo_dir());
        fetcher.init().await?;

        let policy = config.retry.policy();
        let store = Arc::new(ChunkStore::new(
            vector_store,
            config.vector_store.collection.clone(),
            config.vector_store.batch_size,
        ));
        let embedder = Embedder::new(Arc::clone(&provider), policy);

        Ok(Self {
            fetcher,
            indexer: RepoIndexer::new(
                embedder.clone(),
                Arc::clone(&store),
                config.index.indexer_config(),
            ),
            retriever: Retriever::new(embedder, Arc::clone(&store), config.retrieval.top_k),
            synthesizer: Synthesizer::new(provider, policy),
            store,
            analytics: config.analytics.analytics_config(),
        })
    }

    #[must_use]
    pub fn storage_dir(&self) -> &std::path::Path {
        self.fetcher.base_dir()
    }

    /// Clone (or pull) `url`, then chunk, embed and store its code files.
    ///
    /// # Errors
    ///
    /// Returns an error if git fails, or if creating the collection or upserting fails.
    pub async fn index_repository(&self, url: &str) -> Result<IndexReport> {
        let fetched = self.fetcher.fetch(url).await?;
        Ok(self
            .indexer
            .index_repository(&fetched.repo_name, &fetched.local_path)
            .await?)
    }

    /// Re-index an existing clone without touching the remote.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when no clone exists for `repo`.
    pub async fn reindex(&self, repo: &str) -> Result<IndexReport> {
        let root = self.fetcher.repo_path(repo).await?;
        Ok(self.indexer.index_repository(repo, &root).await?)
    }

    /// Retrieve context for `query`, optionally scoped to one repository, and answer it.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding, search or generation fails.
    pub async fn ask(&self, query: &str, repo: Option<&str>) -> Result<Answer> {
        tracing::info!(repo = repo.unwrap_or("*"), "question received");
        let hits = self.retriever.retrieve(query, repo).await?;
        let answer = self.synthesizer.synthesize(query, &hits, repo).await?;
        Ok(Answer {
            answer,
            sources: hits.iter().map(Source::from).collect(),
        })
    }

    /// Documentation-mode answer for one section.
    ///
    /// # Errors
    ///
    /// See [`Sidekick::ask`].
    pub async fn documentation(&self, repo: &str, section: DocSection) -> Result<Answer> {
        self.ask(&section.query(), Some(repo)).await
    }

    /// Error-analysis answer for a pasted stack trace or log.
    ///
    /// # Errors
    ///
    /// See [`Sidekick::ask`].
    pub async fn explain_error(&self, repo: &str, trace: &str) -> Result<Answer> {
        self.ask(&error_analysis_query(trace), Some(repo)).await
    }

    /// # Errors
    ///
    /// Returns a not-found error when no clone exists for `repo`.
    pub async fn dependency_graph(&self, repo: &str) -> Result<DependencyGraph> {
        let root = self.fetcher.repo_path(repo).await?;
        Ok(dependency::dependency_graph(&root).await)
    }

    /// # Errors
    ///
    /// Returns a not-found error when no clone exists for `repo`.
    pub async fn analytics(&self, repo: &str) -> Result<AnalyticsReport> {
        let root = self.fetcher.repo_path(repo).await?;
        Ok(analytics::analyze(&root, &self.analytics).await)
    }

    /// Every non-ignored file of the clone, relative and sorted.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when no clone exists for `repo`.
    pub async fn list_files(&self, repo: &str) -> Result<Vec<String>> {
        let root = self.fetcher.repo_path(repo).await?;
        Ok(list_files(&root))
    }

    /// # Errors
    ///
    /// Returns a not-found error when the clone or file is missing, and an
    /// invalid-path error when `path` escapes the clone.
    pub async fn file_content(&self, repo: &str, path: &str) -> Result<String> {
        let root = self.fetcher.repo_path(repo).await?;
        Ok(read_file(&root, path).await?)
    }

    /// Generate a diagram for one file and sanitize it into renderable Mermaid.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or generation fails.
    pub async fn visualize(&self, repo: &str, path: &str, kind: DiagramKind) -> Result<String> {
        let content = self.file_content(repo, path).await?;
        let raw = self
            .synthesizer
            .generate_diagram(path, &content, kind)
            .await?;
        Ok(diagram::sanitize(&raw, kind))
    }

    /// Purge the repository's vectors (best effort), then delete its clone.
    ///
    /// Returns whether a clone was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the clone exists but cannot be removed.
    pub async fn delete_repository(&self, repo: &str) -> Result<bool> {
        self.store.delete_by_repo(repo).await;
        let removed = self.fetcher.remove(repo).await?;
        tracing::info!(repo = %repo, removed, "repository deleted");
        Ok(removed)
    }

    /// Absolute path of the clone for `repo`.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when no clone exists.
    pub async fn repo_path(&self, repo: &str) -> Result<PathBuf> {
        Ok(self.fetcher.repo_path(repo).await?)
    }
}
