//! # Semantic Recall
//!
//! Local-first semantic memory for AI tools.
//!
//! Short texts (chat messages, code snippets, conversation turns,
//! documents) are embedded through an OpenAI-compatible provider and
//! stored in SQLite. They are later recalled by meaning, scoped to a type
//! or platform, with chat results expanded by the messages around them in
//! time.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────────────┐   ┌──────────────┐
//! │ recall (CLI) │──▶│ SemanticMemory (core) │──▶│ SQLite store │
//! └──────────────┘   │ ingest · search ·     │   └──────────────┘
//!                    │ recall · stats        │   ┌──────────────┐
//!                    └───────────────────────┘──▶│ OpenAI embed │
//!                                                └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export OPENAI_API_KEY=...
//! recall init
//! recall embed --type chat "deploy failed again" --platform slack --timestamp 2024-05-01T12:00:00Z
//! recall search "broken release"
//! recall recall slack "broken release" --context-window 5
//! recall stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`embedding`] | OpenAI-compatible embedding provider |
//! | [`sqlite_store`] | SQLite vector store |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`app`] | Config → [`SemanticMemory`](semantic_recall_core::SemanticMemory) wiring |

pub mod app;
pub mod config;
pub mod db;
pub mod embedding;
pub mod migrate;
pub mod sqlite_store;
