//! # Semantic Recall CLI (`recall`)
//!
//! Bootstrap layer over the `semantic_recall` library: reads the TOML
//! config, resolves the provider credential from `OPENAI_API_KEY` when the
//! file does not set one, and exposes the memory operations as commands.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `recall init` | Create the storage directory, database, and schema |
//! | `recall embed --type <t> "<text>"` | Embed and store one item |
//! | `recall embed-batch <file.jsonl>` | Embed and store one item per JSON line |
//! | `recall search "<query>"` | Similarity search above a threshold |
//! | `recall recall <category> "<query>"` | Category-scoped search with chat context |
//! | `recall stats` | Entry counts per type |
//!
//! Results are printed to stdout as JSON. Logs go to stderr and are
//! controlled with `RUST_LOG`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use semantic_recall::app;
use semantic_recall::config::{self, Config};
use semantic_recall::sqlite_store::SqliteVectorStore;
use semantic_recall_core::models::{EmbedItem, ItemType, Metadata};
use semantic_recall_core::store::VectorStore;

/// Semantic Recall CLI: store short texts and recall them by meaning.
#[derive(Parser)]
#[command(name = "recall", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/recall.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize storage.
    ///
    /// Creates the database file (and its directory) and the schema.
    /// Idempotent. Does not need an API key.
    Init,

    #[command(flatten)]
    Memory(MemoryCommand),
}

/// Commands that embed or query and therefore need the provider.
#[derive(Subcommand)]
enum MemoryCommand {
    /// Embed and store a single item.
    Embed {
        /// Item type: chat, code, conversation, or document.
        #[arg(long = "type")]
        item_type: ItemType,

        /// Text to embed.
        content: String,

        /// Source platform (e.g. `slack`).
        #[arg(long)]
        platform: Option<String>,

        #[arg(long)]
        username: Option<String>,

        /// Content time, RFC 3339 (e.g. `2024-05-01T12:00:00Z`).
        #[arg(long)]
        timestamp: Option<String>,

        /// Extra metadata as `key=value` pairs. Values that parse as JSON
        /// are stored as JSON.
        #[arg(long = "meta", value_parser = parse_key_val)]
        meta: Vec<(String, String)>,
    },

    /// Embed and store every item of a JSON Lines file in one batch.
    ///
    /// Each line is `{"type": "...", "content": "...", "metadata": {...}}`.
    EmbedBatch {
        file: PathBuf,
    },

    /// Search stored items by meaning.
    Search {
        query: String,

        /// Maximum number of results.
        #[arg(long)]
        limit: Option<usize>,

        /// Minimum similarity score.
        #[arg(long, allow_negative_numbers = true)]
        threshold: Option<f32>,
    },

    /// Search within a category, expanding chat results with nearby messages.
    Recall {
        /// Item type or platform to match, or `all`.
        category: String,

        query: String,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, allow_negative_numbers = true)]
        threshold: Option<f32>,

        /// Context band half-width in minutes; 0 disables context.
        #[arg(long)]
        context_window: Option<u32>,
    },

    /// Show entry counts per type.
    Stats,
}

/// Parse a `key=value` pair for `--meta` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn read_batch(path: &Path) -> Result<Vec<EmbedItem>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch file: {}", path.display()))?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid item", path.display(), n + 1))
        })
        .collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn init(cfg: &Config) -> Result<()> {
    let store = SqliteVectorStore::new(&cfg.storage.path, cfg.embedding.dims);
    store.initialize().await?;
    store.close().await;
    println!("Storage initialized at {}", cfg.storage.path.display());
    Ok(())
}

async fn run(cfg: &Config, command: MemoryCommand) -> Result<()> {
    let memory = app::open_memory(cfg)?;

    match command {
        MemoryCommand::Embed {
            item_type,
            content,
            platform,
            username,
            timestamp,
            meta,
        } => {
            let mut metadata = Metadata {
                platform,
                username,
                timestamp,
                ..Default::default()
            };
            for (key, raw) in meta {
                let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
                metadata.extra.insert(key, value);
            }
            let id = memory
                .embed_one(EmbedItem::new(item_type, content).with_metadata(metadata))
                .await?;
            println!("{id}");
        }
        MemoryCommand::EmbedBatch { file } => {
            let items = read_batch(&file)?;
            let ids = memory.embed_batch(items).await?;
            println!("Stored {} entries", ids.len());
        }
        MemoryCommand::Search {
            query,
            limit,
            threshold,
        } => {
            let results = memory
                .search(
                    &query,
                    Some(limit.unwrap_or(cfg.retrieval.default_limit)),
                    Some(threshold.unwrap_or(cfg.retrieval.default_threshold)),
                )
                .await?;
            print_json(&results)?;
        }
        MemoryCommand::Recall {
            category,
            query,
            limit,
            threshold,
            context_window,
        } => {
            let options = app::recall_options(cfg, limit, threshold, context_window);
            let results = memory.recall(&category, &query, &options).await?;
            print_json(&results)?;
        }
        MemoryCommand::Stats => {
            print_json(&memory.get_stats().await?)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg: Config =
        config::load_config(&cli.config)?.with_api_key(std::env::var("OPENAI_API_KEY").ok());

    match cli.command {
        Commands::Init => init(&cfg).await,
        Commands::Memory(command) => run(&cfg, command).await,
    }
}
