//! TOML configuration.
//!
//! ```toml
//! [storage]
//! path = "./data/recall.sqlite"
//!
//! [embedding]
//! model = "text-embedding-3-small"
//! dims = 1536
//!
//! [retrieval]
//! default_limit = 10
//! default_threshold = 0.7
//! context_window_minutes = 3
//! ```
//!
//! `embedding.api_key` has no default. It may be written in the file or
//! injected by the caller with [`Config::with_api_key`]; the library never
//! reads the process environment.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use semantic_recall_core::search::{
    DEFAULT_CONTEXT_WINDOW_MINUTES, DEFAULT_LIMIT, DEFAULT_THRESHOLD,
};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// SQLite database file holding the vectors.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            dims: default_dims(),
            api_base: default_api_base(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
        }
    }
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_threshold")]
    pub default_threshold: f32,
    #[serde(default = "default_context_window")]
    pub context_window_minutes: u32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_threshold: default_threshold(),
            context_window_minutes: default_context_window(),
        }
    }
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}
fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}
fn default_context_window() -> u32 {
    DEFAULT_CONTEXT_WINDOW_MINUTES
}

impl Config {
    /// A config with defaults everywhere except the storage path.
    pub fn with_storage_path(path: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageConfig { path: path.into() },
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }

    /// Fill in the provider credential if the file did not set one.
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        if self.embedding.api_key.is_none() {
            self.embedding.api_key = key.filter(|k| !k.trim().is_empty());
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.embedding.dims == 0 {
            bail!("embedding.dims must be > 0");
        }
        if self.embedding.model.trim().is_empty() {
            bail!("embedding.model must not be empty");
        }
        if self.embedding.timeout_secs == 0 {
            bail!("embedding.timeout_secs must be > 0");
        }
        if self.retrieval.default_limit < 1 {
            bail!("retrieval.default_limit must be >= 1");
        }
        if !self.retrieval.default_threshold.is_finite() {
            bail!("retrieval.default_threshold must be a finite number");
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: Config =
            toml::from_str("[storage]\npath = \"./data/recall.sqlite\"\n").unwrap();
        config.validate().unwrap();
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.embedding.dims, 1536);
        assert!(config.embedding.api_key.is_none());
        assert_eq!(config.retrieval.default_limit, 10);
        assert!((config.retrieval.default_threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.retrieval.context_window_minutes, 3);
    }

    #[test]
    fn test_zero_dims_rejected() {
        let config: Config =
            toml::from_str("[storage]\npath = \"x.sqlite\"\n[embedding]\ndims = 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("embedding.dims"));
    }

    #[test]
    fn test_file_key_wins_over_injected_key() {
        let config: Config = toml::from_str(
            "[storage]\npath = \"x.sqlite\"\n[embedding]\napi_key = \"from-file\"\n",
        )
        .unwrap();
        let config = config.with_api_key(Some("from-env".into()));
        assert_eq!(config.embedding.api_key.as_deref(), Some("from-file"));

        let config = Config::with_storage_path("x.sqlite").with_api_key(Some("  ".into()));
        assert!(config.embedding.api_key.is_none());
    }
}
