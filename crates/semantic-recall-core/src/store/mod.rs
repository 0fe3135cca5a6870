//! Vector store port.
//!
//! The [`VectorStore`] trait is deliberately narrow: vector in, ranked
//! list out. Relevance policy (thresholds, category scoping, context
//! windows) lives in [`crate::search`], not in the store.
//!
//! Implementations must be `Send + Sync`. The engine performs no locking
//! of its own, so a store shared across concurrent calls must tolerate
//! concurrent reads and writes.

pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::RecallResult;
use crate::models::{ScoredEntry, StoredEntry};

/// Durable storage of vectors with a metadata payload per entry.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`initialize`](VectorStore::initialize) | Prepare underlying storage (idempotent) |
/// | [`insert`](VectorStore::insert) | Persist one entry; rejects duplicate ids |
/// | [`query`](VectorStore::query) | Top-k nearest entries, descending by score |
/// | [`count_by_type`](VectorStore::count_by_type) | Optional native aggregate |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Prepare the underlying storage. Safe to call more than once.
    async fn initialize(&self) -> RecallResult<()>;

    /// Persist one entry.
    ///
    /// Fails with [`RecallError::StoreWrite`](crate::error::RecallError::StoreWrite)
    /// if the id already exists or storage is unreachable.
    async fn insert(&self, entry: StoredEntry) -> RecallResult<()>;

    /// Return up to `top_k` entries nearest to `vector`, highest score first.
    ///
    /// Returns fewer than `top_k` when the store holds fewer entries.
    async fn query(&self, vector: &[f32], top_k: usize) -> RecallResult<Vec<ScoredEntry>>;

    /// Native per-`type` entry counts, if the backend can aggregate.
    ///
    /// The default returns `None`, which makes the engine fall back to a
    /// capped similarity sweep.
    async fn count_by_type(&self) -> RecallResult<Option<BTreeMap<String, usize>>> {
        Ok(None)
    }
}
