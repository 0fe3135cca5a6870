//! [`SemanticMemory`]: the caller-facing operation surface.
//!
//! Bundles the lifecycle guard, the ingestor and the retrieval engine
//! over a single long-lived provider/store pair. Every operation calls
//! [`Lifecycle::ensure_ready`] first, so callers never observe an
//! uninitialized store.

use std::sync::Arc;

use crate::embedding::EmbeddingProvider;
use crate::error::RecallResult;
use crate::ids::{IdGenerator, UuidIdGenerator};
use crate::ingest::Ingestor;
use crate::lifecycle::Lifecycle;
use crate::models::{CorpusStats, EmbedItem, SearchResult};
use crate::search::{RecallOptions, RetrievalEngine, DEFAULT_LIMIT, DEFAULT_THRESHOLD};
use crate::store::VectorStore;

pub struct SemanticMemory {
    lifecycle: Lifecycle,
    ingestor: Ingestor,
    engine: RetrievalEngine,
    model: String,
}

impl SemanticMemory {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self::with_id_generator(embedder, store, Arc::new(UuidIdGenerator))
    }

    pub fn with_id_generator(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            lifecycle: Lifecycle::new(Arc::clone(&store)),
            ingestor: Ingestor::new(Arc::clone(&embedder), Arc::clone(&store), ids),
            model: embedder.model_name().to_string(),
            engine: RetrievalEngine::new(embedder, store),
        }
    }

    /// Model every stored vector and query vector comes from.
    pub fn model_name(&self) -> &str {
        &self.model
    }

    pub async fn ensure_ready(&self) -> RecallResult<()> {
        self.lifecycle.ensure_ready().await
    }

    pub async fn embed_one(&self, item: EmbedItem) -> RecallResult<String> {
        self.ensure_ready().await?;
        self.ingestor.embed_one(item).await
    }

    pub async fn embed_batch(&self, items: Vec<EmbedItem>) -> RecallResult<Vec<String>> {
        self.ensure_ready().await?;
        self.ingestor.embed_batch(items).await
    }

    /// Similarity search; `limit` defaults to 10 and `threshold` to 0.7.
    pub async fn search(
        &self,
        query: &str,
        limit: Option<usize>,
        threshold: Option<f32>,
    ) -> RecallResult<Vec<SearchResult>> {
        self.ensure_ready().await?;
        self.engine
            .search(
                query,
                limit.unwrap_or(DEFAULT_LIMIT),
                threshold.unwrap_or(DEFAULT_THRESHOLD),
            )
            .await
    }

    pub async fn recall(
        &self,
        category: &str,
        query: &str,
        options: &RecallOptions,
    ) -> RecallResult<Vec<SearchResult>> {
        self.ensure_ready().await?;
        self.engine.recall(category, query, options).await
    }

    pub async fn get_stats(&self) -> RecallResult<CorpusStats> {
        self.ensure_ready().await?;
        self.engine.get_stats().await
    }
}
