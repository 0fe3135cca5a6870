//! Ingestion: text in, stored vector entries out.
//!
//! Every stored entry carries the caller metadata plus `type`, `content`
//! and an `embedded_at` stamp, so retrieval can rebuild the original text
//! from metadata alone.
//!
//! # Batch semantics
//!
//! [`Ingestor::embed_batch`] makes exactly one provider call for the whole
//! batch and pairs vectors with items by position. Inserts are then issued
//! concurrently and joined; the call succeeds only if every insert
//! succeeded. A failed batch may still have written some entries.

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;

use crate::embedding::EmbeddingProvider;
use crate::error::{RecallError, RecallResult};
use crate::ids::IdGenerator;
use crate::models::{EmbedItem, EntryMetadata, StoredEntry};
use crate::store::VectorStore;

pub struct Ingestor {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    ids: Arc<dyn IdGenerator>,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            embedder,
            store,
            ids,
        }
    }

    /// Embed and store a single item. Returns the new entry id.
    pub async fn embed_one(&self, item: EmbedItem) -> RecallResult<String> {
        validate_content(&item, None)?;

        let vector = self.embedder.embed_one(&item.content).await?;
        self.check_dims(&vector)?;

        let id = self.ids.entry_id(item.item_type);
        let entry = StoredEntry {
            id: id.clone(),
            vector,
            metadata: EntryMetadata::from_item(item, Utc::now()),
        };
        self.store.insert(entry).await?;

        tracing::debug!(id = %id, "entry stored");
        Ok(id)
    }

    /// Embed and store many items with a single provider call.
    ///
    /// Returns the new ids in input order. An empty batch is a no-op and
    /// never reaches the provider.
    pub async fn embed_batch(&self, items: Vec<EmbedItem>) -> RecallResult<Vec<String>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        for (index, item) in items.iter().enumerate() {
            validate_content(item, Some(index))?;
        }

        let texts: Vec<String> = items.iter().map(|i| i.content.clone()).collect();
        let vectors = self.embedder.embed_many(&texts).await?;
        if vectors.len() != items.len() {
            return Err(RecallError::Provider(format!(
                "provider returned {} vectors for {} inputs",
                vectors.len(),
                items.len()
            )));
        }

        let embedded_at = Utc::now();
        let entries = items
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(index, (item, vector))| {
                self.check_dims(&vector)?;
                Ok(StoredEntry {
                    id: self.ids.batch_entry_id(item.item_type, index),
                    vector,
                    metadata: EntryMetadata::from_item(item, embedded_at),
                })
            })
            .collect::<RecallResult<Vec<_>>>()?;

        let total = entries.len();
        let ids: Vec<String> = entries.iter().map(|e| e.id.clone()).collect();

        let outcomes = join_all(entries.into_iter().map(|e| self.store.insert(e))).await;

        let mut failed = 0;
        let mut first = None;
        for outcome in outcomes {
            if let Err(e) = outcome {
                failed += 1;
                first.get_or_insert(e);
            }
        }
        if let Some(first) = first {
            tracing::warn!(failed, total, "batch ingestion partially failed");
            return Err(RecallError::BatchWrite {
                failed,
                total,
                first: Box::new(first),
            });
        }

        tracing::info!(count = total, "batch ingested");
        Ok(ids)
    }

    fn check_dims(&self, vector: &[f32]) -> RecallResult<()> {
        let expected = self.embedder.dims();
        if vector.len() != expected {
            return Err(RecallError::Provider(format!(
                "model {} returned a {}-dimensional vector, expected {}",
                self.embedder.model_name(),
                vector.len(),
                expected
            )));
        }
        Ok(())
    }
}

fn validate_content(item: &EmbedItem, index: Option<usize>) -> RecallResult<()> {
    if !item.content.trim().is_empty() {
        return Ok(());
    }
    Err(RecallError::InvalidInput(match index {
        Some(i) => format!("item {i} has empty content"),
        None => "content must not be empty".to_string(),
    }))
}
