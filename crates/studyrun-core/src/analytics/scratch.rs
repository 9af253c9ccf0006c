//! Transient per-block scratch space.
//!
//! Holds what the presentation layer would otherwise keep in tab-scoped
//! storage: when the block started and how many interactions it has seen.
//! Entries are dropped as soon as the block's response is recorded.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct BlockScratch {
    pub started_at: DateTime<Utc>,
    pub interaction_count: u32,
}

#[derive(Debug, Default)]
pub struct ScratchScope {
    entries: HashMap<String, BlockScratch>,
}

impl ScratchScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) the scratch entry for a block.
    pub fn open(&mut self, block_id: &str, started_at: DateTime<Utc>) {
        self.entries.insert(
            block_id.to_string(),
            BlockScratch {
                started_at,
                interaction_count: 0,
            },
        );
    }

    pub fn get(&self, block_id: &str) -> Option<&BlockScratch> {
        self.entries.get(block_id)
    }

    pub fn get_mut(&mut self, block_id: &str) -> Option<&mut BlockScratch> {
        self.entries.get_mut(block_id)
    }

    pub fn clear(&mut self, block_id: &str) {
        self.entries.remove(block_id);
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
    }
}
