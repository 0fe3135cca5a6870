//! Wiring from [`Config`] to a ready-to-use [`SemanticMemory`].

use anyhow::Result;
use std::sync::Arc;

use semantic_recall_core::embedding::EmbeddingProvider;
use semantic_recall_core::RecallOptions;
use semantic_recall_core::SemanticMemory;

use crate::config::Config;
use crate::embedding::create_provider;
use crate::sqlite_store::SqliteVectorStore;

/// Build a [`SemanticMemory`] over the configured SQLite store and
/// OpenAI-compatible provider.
///
/// Nothing touches the disk or network until the first operation.
pub fn open_memory(config: &Config) -> Result<SemanticMemory> {
    config.validate()?;
    let provider = create_provider(&config.embedding)?;
    Ok(open_memory_with_provider(config, provider))
}

/// Same as [`open_memory`] with a caller-supplied embedding provider.
pub fn open_memory_with_provider(
    config: &Config,
    provider: Arc<dyn EmbeddingProvider>,
) -> SemanticMemory {
    let store = SqliteVectorStore::new(&config.storage.path, config.embedding.dims);
    SemanticMemory::new(provider, Arc::new(store))
}

/// Recall options from `[retrieval]`, with per-call overrides.
pub fn recall_options(
    config: &Config,
    limit: Option<usize>,
    threshold: Option<f32>,
    context_window_minutes: Option<u32>,
) -> RecallOptions {
    RecallOptions {
        limit: limit.unwrap_or(config.retrieval.default_limit),
        threshold: threshold.unwrap_or(config.retrieval.default_threshold),
        context_window_minutes: context_window_minutes
            .unwrap_or(config.retrieval.context_window_minutes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recall_options_prefer_overrides() {
        let mut config = Config::with_storage_path("x.sqlite");
        config.retrieval.context_window_minutes = 7;

        let options = recall_options(&config, Some(3), None, None);
        assert_eq!(options.limit, 3);
        assert!((options.threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(options.context_window_minutes, 7);

        let options = recall_options(&config, None, Some(0.2), Some(0));
        assert_eq!(options.limit, 10);
        assert_eq!(options.context_window_minutes, 0);
    }

    #[test]
    fn test_open_memory_requires_api_key() {
        let config = Config::with_storage_path("x.sqlite");
        let err = open_memory(&config).err().unwrap();
        assert!(err.to_string().contains("api_key"));
    }
}
