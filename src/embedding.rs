//! OpenAI-compatible embedding provider.
//!
//! [`OpenAIProvider`] implements the core [`EmbeddingProvider`] port by
//! calling `POST {api_base}/embeddings`. Any server speaking the same
//! request/response shape works (OpenAI, Azure-style proxies, local
//! gateways).
//!
//! # Retry Strategy
//!
//! Retries are off by default (`embedding.max_retries = 0`). When enabled:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! A failure after the last attempt is reported as
//! [`RecallError::Provider`].

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use semantic_recall_core::embedding::EmbeddingProvider;
use semantic_recall_core::{RecallError, RecallResult};

use crate::config::EmbeddingConfig;

/// Embedding provider for the OpenAI embeddings API.
///
/// The credential is passed in through [`EmbeddingConfig::api_key`];
/// construction fails with [`RecallError::Config`] without one.
pub struct OpenAIProvider {
    /// Model name (e.g. `"text-embedding-3-small"`).
    model: String,
    /// Vector dimensionality (e.g. `1536`).
    dims: usize,
    endpoint: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: &EmbeddingConfig) -> RecallResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| RecallError::Config("embedding api_key is required".to_string()))?;
        if config.dims == 0 {
            return Err(RecallError::Config("embedding.dims must be > 0".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RecallError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            model: config.model.clone(),
            dims: config.dims,
            endpoint: format!("{}/embeddings", config.api_base.trim_end_matches('/')),
            api_key,
            max_retries: config.max_retries,
            client,
        })
    }

    async fn request(&self, texts: &[String]) -> RecallResult<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::debug!(attempt, delay_secs = delay.as_secs(), "retrying embedding call");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await.map_err(|e| {
                            RecallError::Provider(format!("invalid embeddings response: {e}"))
                        })?;
                        return parse_openai_response(&json, texts.len());
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = RecallError::Provider(format!(
                        "embeddings API error {status}: {body_text}"
                    ));

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    last_err = Some(RecallError::Provider(format!(
                        "embeddings request failed: {e}"
                    )));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| RecallError::Provider("embedding failed after retries".to_string())))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_one(&self, text: &str) -> RecallResult<Vec<f32>> {
        self.request(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RecallError::Provider("empty embedding response".to_string()))
    }

    async fn embed_many(&self, texts: &[String]) -> RecallResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }
}

/// Build the configured embedding provider.
pub fn create_provider(config: &EmbeddingConfig) -> RecallResult<Arc<dyn EmbeddingProvider>> {
    let provider = OpenAIProvider::new(config)?;
    tracing::debug!(model = %provider.model, dims = provider.dims, "embedding provider ready");
    Ok(Arc::new(provider))
}

/// Parse the `data[]` array of an embeddings response.
///
/// Entries are ordered by their `index` field, not by array position. The
/// indices must cover `0..expected` exactly once each.
fn parse_openai_response(
    json: &serde_json::Value,
    expected: usize,
) -> RecallResult<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| RecallError::Provider("invalid response: missing data array".to_string()))?;

    if data.len() != expected {
        return Err(RecallError::Provider(format!(
            "expected {} embeddings, got {}",
            expected,
            data.len()
        )));
    }

    let mut seen = vec![false; expected];
    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        match seen.get_mut(index) {
            Some(slot) if !*slot => *slot = true,
            Some(_) => {
                return Err(RecallError::Provider(format!(
                    "invalid response: duplicate embedding index {index}"
                )))
            }
            None => {
                return Err(RecallError::Provider(format!(
                    "invalid response: embedding index {index} out of range for {expected} inputs"
                )))
            }
        }
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                RecallError::Provider("invalid response: missing embedding".to_string())
            })?;

        let vec = embedding
            .iter()
            .map(|v| {
                v.as_f64().map(|f| f as f32).ok_or_else(|| {
                    RecallError::Provider("invalid response: non-numeric embedding".to_string())
                })
            })
            .collect::<RecallResult<Vec<f32>>>()?;

        indexed.push((index, vec));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}
