//! Entry id generation.
//!
//! Ids have the form `{type}_{suffix}` for single inserts and
//! `{type}_{index}_{suffix}` for batch inserts, where `index` is the
//! item's position in the batch. The suffix comes from an injected
//! [`IdGenerator`], so uniqueness is a property of the generator rather
//! than of timing.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::models::ItemType;

/// Produces suffixes that never repeat within one generator instance.
pub trait IdGenerator: Send + Sync {
    fn next_suffix(&self) -> String;

    /// Id for a standalone insert.
    fn entry_id(&self, item_type: ItemType) -> String {
        format!("{}_{}", item_type, self.next_suffix())
    }

    /// Id for the item at `index` of a batch insert.
    fn batch_entry_id(&self, item_type: ItemType, index: usize) -> String {
        format!("{}_{}_{}", item_type, index, self.next_suffix())
    }
}

/// Random v4 UUID suffixes. Unique across processes sharing a store.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_suffix(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Monotonic counter suffixes. Unique within one process and deterministic,
/// which makes ids predictable in tests.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_suffix(&self) -> String {
        self.next.fetch_add(1, Ordering::Relaxed).to_string()
    }
}
