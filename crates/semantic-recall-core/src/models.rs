//! Data models that flow through ingestion and retrieval.
//!
//! Caller metadata is a structured record with a few well-known optional
//! fields (`platform`, `username`, `timestamp`) plus an open `extra` map.
//! On disk it is flattened into a single JSON object together with the
//! system-stamped `type`, `content` and `embedded_at` fields.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Category recorded for stored entries whose `type` field is missing.
pub const UNKNOWN_TYPE: &str = "unknown";

/// Semantic category of an ingested item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Chat,
    Code,
    Conversation,
    Document,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Chat => "chat",
            ItemType::Code => "code",
            ItemType::Conversation => "conversation",
            ItemType::Document => "document",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(ItemType::Chat),
            "code" => Ok(ItemType::Code),
            "conversation" => Ok(ItemType::Conversation),
            "document" => Ok(ItemType::Document),
            other => Err(format!(
                "Unknown item type: '{}'. Must be chat, code, conversation, or document.",
                other
            )),
        }
    }
}

/// Caller-supplied metadata attached to an [`EmbedItem`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Source platform (e.g. `"slack"`, `"discord"`).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_number"
    )]
    pub platform: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_number"
    )]
    pub username: Option<String>,
    /// Content time of the item (RFC 3339 preferred, see
    /// [`parse_timestamp`](crate::search::parse_timestamp)).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_number"
    )]
    pub timestamp: Option<String>,
    /// Anything else the caller wants to keep alongside the item.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Accepts a JSON string or number for fields stored as text.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_to_string))
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Input to ingestion: one unit of text to embed and store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedItem {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl EmbedItem {
    pub fn new(item_type: ItemType, content: impl Into<String>) -> Self {
        Self {
            item_type,
            content: content.into(),
            metadata: Metadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Metadata persisted with every stored vector.
///
/// Serializes to one flat JSON object: `{"content", "type", "embedded_at",
/// "platform", "username", "timestamp", ...extra}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub content: String,
    /// Item type as stored. A `String` rather than [`ItemType`] so that
    /// entries written by other tools (or missing the field) still decode.
    #[serde(rename = "type")]
    pub item_type: String,
    /// Ingestion time (not content time), RFC 3339 UTC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_at: Option<String>,
    #[serde(flatten)]
    pub fields: Metadata,
}

impl EntryMetadata {
    /// Build stored metadata from a caller item, stamping `embedded_at`.
    ///
    /// System fields win over caller `extra` keys of the same name.
    pub fn from_item(item: EmbedItem, embedded_at: DateTime<Utc>) -> Self {
        let mut fields = item.metadata;
        for key in ["content", "type", "embedded_at"] {
            fields.extra.remove(key);
        }
        Self {
            content: item.content,
            item_type: item.item_type.as_str().to_string(),
            embedded_at: Some(embedded_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            fields,
        }
    }

    /// Decode stored metadata without failing.
    ///
    /// Missing `content` degrades to `""` and missing `type` to
    /// [`UNKNOWN_TYPE`]; each substitution is logged as a warning.
    pub fn from_value(value: Value) -> Self {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                tracing::warn!(kind = %json_kind(&other), "stored metadata is not an object");
                Map::new()
            }
        };

        let content = take_string(&mut map, "content").unwrap_or_else(|| {
            tracing::warn!("stored entry is missing content");
            String::new()
        });
        let item_type = take_string(&mut map, "type").unwrap_or_else(|| {
            tracing::warn!("stored entry is missing type");
            UNKNOWN_TYPE.to_string()
        });
        let embedded_at = take_string(&mut map, "embedded_at");
        let platform = take_string(&mut map, "platform");
        let username = take_string(&mut map, "username");
        let timestamp = take_string(&mut map, "timestamp");

        Self {
            content,
            item_type,
            embedded_at,
            fields: Metadata {
                platform,
                username,
                timestamp,
                extra: map,
            },
        }
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn platform(&self) -> Option<&str> {
        self.fields.platform.as_deref()
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.fields.timestamp.as_deref()
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    map.remove(key).and_then(value_to_string)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A persisted record: created once at ingestion, immutable thereafter.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: EntryMetadata,
}

/// One candidate returned by a vector store query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntry {
    pub metadata: EntryMetadata,
    /// Store-native similarity, higher = more similar.
    pub score: f32,
}

/// A retrieval result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub content: String,
    pub metadata: EntryMetadata,
    pub similarity: f32,
    /// Temporally adjacent messages (recall only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<SearchResult>>,
}

impl From<ScoredEntry> for SearchResult {
    fn from(entry: ScoredEntry) -> Self {
        Self {
            content: entry.metadata.content.clone(),
            metadata: entry.metadata,
            similarity: entry.score,
            context: None,
        }
    }
}

/// Corpus statistics: entry counts per `type`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    pub total: usize,
    pub categories: BTreeMap<String, usize>,
}

impl CorpusStats {
    pub fn from_counts(categories: BTreeMap<String, usize>) -> Self {
        Self {
            total: categories.values().sum(),
            categories,
        }
    }
}
