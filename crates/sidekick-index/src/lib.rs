//! Repository ingestion and analysis.
//!
//! Clones are fetched by [`repo::RepoFetcher`], split into overlapping line windows
//! by [`chunker`], embedded and written to a vector store through [`store::ChunkStore`],
//! and searched back with [`retriever::Retriever`]. [`dependency`], [`complexity`] and
//! [`analytics`] run heuristic analyses over the same file set.

pub mod analytics;
pub mod chunker;
pub mod complexity;
pub mod dependency;
pub mod error;
pub mod indexer;
pub mod languages;
pub mod repo;
pub mod retriever;
pub mod store;

pub use error::{IndexError, Result};
