//! Deterministic embedding stub shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{RecallError, RecallResult};
use crate::models::{ScoredEntry, StoredEntry};
use crate::store::memory::InMemoryVectorStore;
use crate::store::VectorStore;

/// Returns fixed vectors for registered texts, a fallback vector if one is
/// set, and otherwise a pseudo-random vector derived from the text bytes.
pub struct StubEmbedder {
    dims: usize,
    reported_dims: usize,
    vectors: HashMap<String, Vec<f32>>,
    fallback: Option<Vec<f32>>,
    fail_prefix: Option<String>,
    single: AtomicUsize,
    batch: AtomicUsize,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self::with_dims(16)
    }

    pub fn with_dims(dims: usize) -> Self {
        Self {
            dims,
            reported_dims: dims,
            vectors: HashMap::new(),
            fallback: None,
            fail_prefix: None,
            single: AtomicUsize::new(0),
            batch: AtomicUsize::new(0),
        }
    }

    /// Advertise a dimension different from what is actually produced.
    pub fn reporting_dims(mut self, dims: usize) -> Self {
        self.reported_dims = dims;
        self
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn with_fallback(mut self, vector: Vec<f32>) -> Self {
        self.fallback = Some(vector);
        self
    }

    /// Fail every call with [`RecallError::Provider`].
    pub fn failing(self) -> Self {
        self.failing_on("")
    }

    /// Fail calls whose text (any text, for batches) starts with `prefix`.
    pub fn failing_on(mut self, prefix: &str) -> Self {
        self.fail_prefix = Some(prefix.to_string());
        self
    }

    fn check(&self, text: &str) -> RecallResult<()> {
        match &self.fail_prefix {
            Some(prefix) if text.starts_with(prefix.as_str()) => Err(RecallError::Provider(
                format!("stub provider refused {text:?}"),
            )),
            _ => Ok(()),
        }
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(v) = self.vectors.get(text) {
            return v.clone();
        }
        if let Some(v) = &self.fallback {
            return v.clone();
        }
        hashed_vector(text, self.dims)
    }

    pub fn single_calls(&self) -> usize {
        self.single.load(Ordering::SeqCst)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch.load(Ordering::SeqCst)
    }
}

fn hashed_vector(text: &str, dims: usize) -> Vec<f32> {
    // FNV-1a seed, splitmix64 stream.
    let mut state = text.bytes().fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
        (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    });
    (0..dims)
        .map(|_| {
            state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
            let mut z = state;
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
            z ^= z >> 31;
            (z >> 40) as f32 / (1u64 << 24) as f32 * 2.0 - 1.0
        })
        .collect()
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    fn model_name(&self) -> &str {
        "stub"
    }

    fn dims(&self) -> usize {
        self.reported_dims
    }

    async fn embed_one(&self, text: &str) -> RecallResult<Vec<f32>> {
        self.single.fetch_add(1, Ordering::SeqCst);
        self.check(text)?;
        Ok(self.vector_for(text))
    }

    async fn embed_many(&self, texts: &[String]) -> RecallResult<Vec<Vec<f32>>> {
        self.batch.fetch_add(1, Ordering::SeqCst);
        for text in texts {
            self.check(text)?;
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}

/// In-memory store whose queries always fail with [`RecallError::StoreQuery`].
#[derive(Default)]
pub struct BrokenQueryStore {
    inner: InMemoryVectorStore,
}

#[async_trait]
impl VectorStore for BrokenQueryStore {
    async fn initialize(&self) -> RecallResult<()> {
        Ok(())
    }

    async fn insert(&self, entry: StoredEntry) -> RecallResult<()> {
        self.inner.insert(entry).await
    }

    async fn query(&self, _vector: &[f32], _top_k: usize) -> RecallResult<Vec<ScoredEntry>> {
        Err(RecallError::StoreQuery("index unavailable".to_string()))
    }
}
