//! Retrieval engine: similarity search, category-scoped recall, temporal
//! context expansion, and corpus statistics.
//!
//! The engine talks to the outside world only through the
//! [`EmbeddingProvider`] and [`VectorStore`] ports.
//!
//! # Search
//!
//! 1. Embed the query with the same provider used for ingestion.
//! 2. Ask the store for exactly `limit` nearest candidates.
//! 3. Keep candidates with `score >= threshold`, in store order.
//!
//! Thresholding happens here rather than in the store, so the store port
//! stays "vector in, ranked list out".
//!
//! # Recall
//!
//! 1. Over-fetch `2 × limit` via search.
//! 2. Keep results whose `type` or `platform` equals the category
//!    (everything for `"all"`).
//! 3. Truncate to `limit`.
//! 4. For chat results carrying a timestamp, attach messages from the
//!    same platform within `± context_window_minutes`.
//!
//! # Approximations
//!
//! The store port has no time-range, equality filter or count primitive.
//! Context expansion therefore runs a broad secondary search
//! ([`CONTEXT_CANDIDATES`] candidates at [`CONTEXT_THRESHOLD`]) and then
//! applies an exact closed-interval time filter and exact platform match.
//! Statistics use the store's native [`count_by_type`](VectorStore::count_by_type)
//! when available and otherwise sweep at most [`STATS_SCAN_CAP`] entries,
//! so a larger corpus is undercounted.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc};

use crate::embedding::EmbeddingProvider;
use crate::error::{RecallError, RecallResult};
use crate::models::{CorpusStats, EntryMetadata, ItemType, SearchResult};
use crate::store::VectorStore;

pub const DEFAULT_LIMIT: usize = 10;
pub const DEFAULT_THRESHOLD: f32 = 0.7;
pub const DEFAULT_CONTEXT_WINDOW_MINUTES: u32 = 3;

/// Category value that disables category scoping in [`RetrievalEngine::recall`].
pub const ALL_CATEGORIES: &str = "all";

/// Candidate cap of the secondary search behind context expansion.
pub const CONTEXT_CANDIDATES: usize = 20;
/// Relaxed threshold of the secondary search behind context expansion.
pub const CONTEXT_THRESHOLD: f32 = 0.5;
/// Upper bound on entries visited by the statistics sweep.
pub const STATS_SCAN_CAP: usize = 10_000;
/// Threshold of the statistics sweep: admits any finite score.
const STATS_SCAN_THRESHOLD: f32 = f32::MIN;

/// Platform assumed for anchors that carry no `platform` field.
const UNKNOWN_PLATFORM: &str = "unknown";

/// Tuning for [`RetrievalEngine::recall`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecallOptions {
    pub limit: usize,
    pub threshold: f32,
    /// Half-width of the context band in minutes. `0` disables expansion.
    pub context_window_minutes: u32,
}

impl Default for RecallOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            threshold: DEFAULT_THRESHOLD,
            context_window_minutes: DEFAULT_CONTEXT_WINDOW_MINUTES,
        }
    }
}

pub struct RetrievalEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl RetrievalEngine {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Nearest stored items to `query` scoring at least `threshold`.
    ///
    /// Returns at most `limit` results, possibly none.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        threshold: f32,
    ) -> RecallResult<Vec<SearchResult>> {
        if threshold.is_nan() {
            return Err(RecallError::InvalidInput(
                "threshold must be a number".to_string(),
            ));
        }

        let vector = self.embedder.embed_one(query).await?;
        let candidates = self.store.query(&vector, limit).await?;
        let fetched = candidates.len();

        let results: Vec<SearchResult> = candidates
            .into_iter()
            .take(limit)
            .filter(|c| c.score >= threshold)
            .map(SearchResult::from)
            .collect();

        tracing::debug!(fetched, kept = results.len(), limit, threshold, "search");
        Ok(results)
    }

    /// Category-scoped search with optional temporal context.
    ///
    /// `category` is matched against each result's `type` and `platform`;
    /// [`ALL_CATEGORIES`] keeps everything.
    pub async fn recall(
        &self,
        category: &str,
        query: &str,
        options: &RecallOptions,
    ) -> RecallResult<Vec<SearchResult>> {
        let fetched = self
            .search(query, options.limit.saturating_mul(2), options.threshold)
            .await?;

        let mut results: Vec<SearchResult> = fetched
            .into_iter()
            .filter(|r| matches_category(&r.metadata, category))
            .take(options.limit)
            .collect();

        if options.context_window_minutes > 0 {
            for result in &mut results {
                if result.metadata.item_type != ItemType::Chat.as_str() {
                    continue;
                }
                let Some(raw) = result.metadata.timestamp() else {
                    continue;
                };
                let Some(anchor) = parse_timestamp(raw) else {
                    tracing::warn!(
                        timestamp = %raw,
                        "unparseable anchor timestamp, skipping context"
                    );
                    continue;
                };
                let platform = result
                    .metadata
                    .platform()
                    .unwrap_or(UNKNOWN_PLATFORM)
                    .to_string();

                let context = self
                    .get_contextual_messages(anchor, &platform, options.context_window_minutes)
                    .await?;
                result.context = Some(context);
            }
        }

        tracing::debug!(category, returned = results.len(), "recall");
        Ok(results)
    }

    /// Messages from `platform` whose timestamp lies in the closed band
    /// `[anchor - window, anchor + window]`, oldest first.
    pub async fn get_contextual_messages(
        &self,
        anchor: DateTime<Utc>,
        platform: &str,
        window_minutes: u32,
    ) -> RecallResult<Vec<SearchResult>> {
        let window = Duration::minutes(i64::from(window_minutes));
        let start = anchor
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = anchor
            .checked_add_signed(window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let query = format!(
            "messages from {} around {}",
            platform,
            anchor.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        let candidates = self
            .search(&query, CONTEXT_CANDIDATES, CONTEXT_THRESHOLD)
            .await?;

        let mut in_band: Vec<(DateTime<Utc>, SearchResult)> = candidates
            .into_iter()
            .filter(|r| r.metadata.platform() == Some(platform))
            .filter_map(|r| {
                let ts = parse_timestamp(r.metadata.timestamp()?)?;
                (start <= ts && ts <= end).then_some((ts, r))
            })
            .collect();
        in_band.sort_by_key(|(ts, _)| *ts);

        Ok(in_band.into_iter().map(|(_, r)| r).collect())
    }

    /// Entry counts per `type`; `total` is always the sum of the counts.
    ///
    /// Stores that can aggregate natively answer through
    /// [`VectorStore::count_by_type`]. Otherwise an empty-string query sweeps
    /// up to [`STATS_SCAN_CAP`] entries. The sweep threshold is `f32::MIN`
    /// rather than `0.0`: cosine scores go down to `-1.0`, and a zero floor
    /// would leave entries pointing away from the query vector uncounted.
    pub async fn get_stats(&self) -> RecallResult<CorpusStats> {
        if let Some(counts) = self.store.count_by_type().await? {
            return Ok(CorpusStats::from_counts(counts));
        }

        let sweep = self.search("", STATS_SCAN_CAP, STATS_SCAN_THRESHOLD).await?;
        if sweep.len() == STATS_SCAN_CAP {
            tracing::warn!(
                cap = STATS_SCAN_CAP,
                "stats sweep hit its cap, counts are a lower bound"
            );
        }

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for result in sweep {
            *counts.entry(result.metadata.item_type).or_insert(0) += 1;
        }
        Ok(CorpusStats::from_counts(counts))
    }
}

fn matches_category(meta: &EntryMetadata, category: &str) -> bool {
    category == ALL_CATEGORIES || meta.item_type == category || meta.platform() == Some(category)
}

/// Parse a stored `timestamp` value.
///
/// Accepts RFC 3339, naive `YYYY-MM-DD[T ]HH:MM:SS[.fff]` (read as UTC),
/// and integer Unix time in seconds or, for magnitudes of 10^11 and
/// above, milliseconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    let n: i64 = raw.parse().ok()?;
    if n.unsigned_abs() >= 100_000_000_000 {
        DateTime::from_timestamp_millis(n)
    } else {
        DateTime::from_timestamp(n, 0)
    }
}
