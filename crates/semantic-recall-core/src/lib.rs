//! # Semantic Recall Core
//!
//! Runtime-agnostic logic for Semantic Recall: data models, the embedding
//! and vector store ports, ingestion, and the retrieval engine (threshold
//! filtering, category scoping, temporal context expansion, statistics).
//!
//! This crate contains no database, HTTP, or filesystem code. Concrete
//! adapters (SQLite store, OpenAI-compatible provider) live in the
//! `semantic-recall` app crate; [`store::memory`] is provided for tests
//! and embedded use.
//!
//! ```text
//!  EmbedItem ──▶ Ingestor ──▶ EmbeddingProvider ──▶ VectorStore
//!                                                      │
//!  query ──▶ RetrievalEngine ──▶ EmbeddingProvider ────┘
//!                 │
//!                 └─▶ threshold ▸ category ▸ limit ▸ context
//! ```

pub mod embedding;
pub mod error;
pub mod ids;
pub mod ingest;
pub mod lifecycle;
pub mod memory;
pub mod models;
pub mod search;
pub mod store;

#[cfg(test)]
mod testing;

pub use error::{RecallError, RecallResult};
pub use memory::SemanticMemory;
pub use models::{CorpusStats, EmbedItem, EntryMetadata, ItemType, Metadata, SearchResult};
pub use search::RecallOptions;
