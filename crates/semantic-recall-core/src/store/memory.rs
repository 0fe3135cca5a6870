//! In-memory [`VectorStore`] implementation for tests and embedding.
//!
//! Entries live in a `Vec` behind a `tokio::sync::RwLock`. Queries are
//! brute-force cosine similarity over every stored vector. Scores are in
//! `[-1.0, 1.0]`. No native aggregate is offered, so statistics go
//! through the engine's capped sweep.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::embedding::cosine_similarity;
use crate::error::{RecallError, RecallResult};
use crate::models::{ScoredEntry, StoredEntry};

use super::VectorStore;

#[derive(Default)]
pub struct InMemoryVectorStore {
    entries: RwLock<Vec<StoredEntry>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Snapshot of every stored entry, in insertion order.
    pub async fn entries(&self) -> Vec<StoredEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn initialize(&self) -> RecallResult<()> {
        Ok(())
    }

    async fn insert(&self, entry: StoredEntry) -> RecallResult<()> {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|e| e.id == entry.id) {
            return Err(RecallError::StoreWrite(format!(
                "duplicate entry id: {}",
                entry.id
            )));
        }
        entries.push(entry);
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> RecallResult<Vec<ScoredEntry>> {
        let entries = self.entries.read().await;
        let mut scored: Vec<ScoredEntry> = entries
            .iter()
            .map(|e| ScoredEntry {
                metadata: e.metadata.clone(),
                score: cosine_similarity(vector, &e.vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);

        Ok(scored)
    }
}
