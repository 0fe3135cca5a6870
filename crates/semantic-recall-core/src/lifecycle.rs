//! One-time store initialization guard.
//!
//! [`Lifecycle::ensure_ready`] runs [`VectorStore::initialize`] exactly
//! once per process on success. Concurrent first callers wait on the same
//! initialization. A failed initialization leaves the guard unset, so the
//! error reaches the caller unchanged and a later call starts over.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::error::{RecallError, RecallResult};
use crate::store::VectorStore;

pub struct Lifecycle {
    store: Arc<dyn VectorStore>,
    ready: OnceCell<()>,
}

impl Lifecycle {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            ready: OnceCell::new(),
        }
    }

    pub async fn ensure_ready(&self) -> RecallResult<()> {
        self.ready
            .get_or_try_init(|| async {
                self.store.initialize().await?;
                tracing::info!("vector store initialized");
                Ok::<(), RecallError>(())
            })
            .await
            .map(|_| ())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScoredEntry, StoredEntry};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStore {
        inits: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl VectorStore for CountingStore {
        async fn initialize(&self) -> RecallResult<()> {
            let n = self.inits.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && n == 0 {
                return Err(RecallError::StorageInit("disk unavailable".into()));
            }
            Ok(())
        }

        async fn insert(&self, _entry: StoredEntry) -> RecallResult<()> {
            Ok(())
        }

        async fn query(&self, _vector: &[f32], _top_k: usize) -> RecallResult<Vec<ScoredEntry>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_initializes_once() {
        let store = Arc::new(CountingStore {
            inits: AtomicUsize::new(0),
            fail_first: false,
        });
        let lifecycle = Lifecycle::new(store.clone());

        assert!(!lifecycle.is_ready());
        lifecycle.ensure_ready().await.unwrap();
        lifecycle.ensure_ready().await.unwrap();
        lifecycle.ensure_ready().await.unwrap();

        assert!(lifecycle.is_ready());
        assert_eq!(store.inits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_surfaced_unchanged() {
        let store = Arc::new(CountingStore {
            inits: AtomicUsize::new(0),
            fail_first: true,
        });
        let lifecycle = Lifecycle::new(store.clone());

        let err = lifecycle.ensure_ready().await.unwrap_err();
        assert!(matches!(err, RecallError::StorageInit(_)));
        assert!(!lifecycle.is_ready());

        lifecycle.ensure_ready().await.unwrap();
        assert_eq!(store.inits.load(Ordering::SeqCst), 2);
    }
}
