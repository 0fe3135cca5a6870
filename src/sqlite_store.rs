//! SQLite-backed [`VectorStore`] implementation.
//!
//! Vectors are stored as little-endian f32 BLOBs next to their flat JSON
//! metadata. Queries score every row with cosine similarity, so scores
//! lie in `[-1.0, 1.0]` with higher meaning more similar. Per-type counts
//! come from a `GROUP BY` instead of the engine's capped sweep.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use tokio::sync::OnceCell;

use semantic_recall_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use semantic_recall_core::models::{EntryMetadata, ScoredEntry, StoredEntry};
use semantic_recall_core::store::VectorStore;
use semantic_recall_core::{RecallError, RecallResult};

use crate::{db, migrate};

/// SQLite implementation of the [`VectorStore`] port.
///
/// Construction does not touch the disk. [`initialize`](VectorStore::initialize)
/// creates the parent directory and database file, runs migrations, and
/// opens the pool shared by all later calls.
pub struct SqliteVectorStore {
    path: PathBuf,
    dims: usize,
    pool: OnceCell<SqlitePool>,
}

impl SqliteVectorStore {
    pub fn new(path: impl Into<PathBuf>, dims: usize) -> Self {
        Self {
            path: path.into(),
            dims,
            pool: OnceCell::new(),
        }
    }

    fn pool(&self) -> Option<&SqlitePool> {
        self.pool.get()
    }

    /// Close the pool, flushing the WAL. Later calls fail until the
    /// process opens a new store.
    pub async fn close(&self) {
        if let Some(pool) = self.pool() {
            pool.close().await;
        }
    }
}

fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn initialize(&self) -> RecallResult<()> {
        self.pool
            .get_or_try_init(|| async {
                let pool = db::connect(&self.path).await?;
                migrate::run_migrations(&pool).await?;
                tracing::info!(path = %self.path.display(), "sqlite store ready");
                Ok::<_, anyhow::Error>(pool)
            })
            .await
            .map_err(|e| RecallError::StorageInit(format!("{e:#}")))?;
        Ok(())
    }

    async fn insert(&self, entry: StoredEntry) -> RecallResult<()> {
        let pool = self
            .pool()
            .ok_or_else(|| RecallError::StoreWrite("store is not initialized".to_string()))?;

        if entry.vector.len() != self.dims {
            return Err(RecallError::StoreWrite(format!(
                "entry {} has {} dimensions, store expects {}",
                entry.id,
                entry.vector.len(),
                self.dims
            )));
        }

        let metadata_json = serde_json::to_string(&entry.metadata)
            .map_err(|e| RecallError::StoreWrite(format!("entry {}: {e}", entry.id)))?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO entries (id, item_type, embedding, dims, metadata_json, content_hash, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.metadata.item_type)
        .bind(vec_to_blob(&entry.vector))
        .bind(entry.vector.len() as i64)
        .bind(&metadata_json)
        .bind(content_hash(&entry.metadata.content))
        .bind(now)
        .execute(pool)
        .await
        .map_err(|e| RecallError::StoreWrite(format!("entry {}: {e}", entry.id)))?;

        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> RecallResult<Vec<ScoredEntry>> {
        let pool = self
            .pool()
            .ok_or_else(|| RecallError::StoreQuery("store is not initialized".to_string()))?;

        // Insertion order, so equal scores keep a stable ranking.
        let rows = sqlx::query("SELECT id, embedding, metadata_json FROM entries ORDER BY rowid")
            .fetch_all(pool)
            .await
            .map_err(|e| RecallError::StoreQuery(e.to_string()))?;

        let mut scored: Vec<(f32, usize)> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let blob: Vec<u8> = row.get("embedding");
                (cosine_similarity(vector, &blob_to_vec(&blob)), i)
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        // Metadata is only decoded for the rows that are returned.
        Ok(scored
            .into_iter()
            .map(|(score, i)| {
                let row = &rows[i];
                let raw: String = row.get("metadata_json");
                let value = serde_json::from_str(&raw).unwrap_or_else(|e| {
                    let id: String = row.get("id");
                    tracing::warn!(id = %id, error = %e, "corrupt metadata_json");
                    serde_json::Value::Null
                });
                ScoredEntry {
                    metadata: EntryMetadata::from_value(value),
                    score,
                }
            })
            .collect())
    }

    async fn count_by_type(&self) -> RecallResult<Option<BTreeMap<String, usize>>> {
        let pool = self
            .pool()
            .ok_or_else(|| RecallError::StoreQuery("store is not initialized".to_string()))?;

        let rows = sqlx::query("SELECT item_type, COUNT(*) AS n FROM entries GROUP BY item_type")
            .fetch_all(pool)
            .await
            .map_err(|e| RecallError::StoreQuery(e.to_string()))?;

        let counts = rows
            .iter()
            .map(|row| {
                let item_type: String = row.get("item_type");
                let n: i64 = row.get("n");
                (item_type, n as usize)
            })
            .collect();

        Ok(Some(counts))
    }
}
