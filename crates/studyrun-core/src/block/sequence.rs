//! Block Sequence Store.

use super::model::Block;
use crate::error::{Result, StudyError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// The ordered, immutable list of blocks for one session.
///
/// Cloning is cheap; all clones share the same blocks.
#[derive(Debug, Clone)]
pub struct BlockSequence {
    blocks: Arc<[Block]>,
    index: Arc<HashMap<String, usize>>,
}

impl BlockSequence {
    /// Builds the store from fetched blocks, ordering them by `order`.
    ///
    /// Blocks sharing an `order` keep their fetched relative order.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Load` if the list is empty or contains duplicate ids.
    pub fn new(mut blocks: Vec<Block>) -> Result<Self> {
        if blocks.is_empty() {
            return Err(StudyError::load("study has no blocks"));
        }

        blocks.sort_by_key(|block| block.order);

        let mut index = HashMap::with_capacity(blocks.len());
        for (position, block) in blocks.iter().enumerate() {
            if index.insert(block.id.clone(), position).is_some() {
                return Err(StudyError::load(format!(
                    "duplicate block id '{}'",
                    block.id
                )));
            }
        }

        Ok(Self {
            blocks: blocks.into(),
            index: Arc::new(index),
        })
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn by_id(&self, block_id: &str) -> Option<&Block> {
        self.index_of(block_id).and_then(|i| self.blocks.get(i))
    }

    pub fn index_of(&self, block_id: &str) -> Option<usize> {
        self.index.get(block_id).copied()
    }

    /// Whether `index` is the last block of the sequence.
    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.blocks.len()
    }

    /// Ids of every block strictly before `index`.
    pub fn ids_before(&self, index: usize) -> HashSet<&str> {
        self.blocks
            .iter()
            .take(index)
            .map(|block| block.id.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockType;

    fn sample() -> Vec<Block> {
        vec![
            Block::new("end", BlockType::ThankYou, 3),
            Block::new("start", BlockType::Welcome, 1),
            Block::new("q", BlockType::YesNo, 2),
        ]
    }

    #[test]
    fn test_orders_blocks() {
        let seq = BlockSequence::new(sample()).unwrap();
        let ids: Vec<&str> = seq.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["start", "q", "end"]);
        assert_eq!(seq.index_of("q"), Some(1));
        assert!(seq.is_last(2));
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        let mut blocks = sample();
        blocks.push(Block::new("q", BlockType::OpenQuestion, 4));
        assert!(BlockSequence::new(blocks).unwrap_err().is_load());
        assert!(BlockSequence::new(Vec::new()).unwrap_err().is_load());
    }

    #[test]
    fn test_ids_before() {
        let seq = BlockSequence::new(sample()).unwrap();
        let ids = seq.ids_before(2);
        assert!(ids.contains("start"));
        assert!(ids.contains("q"));
        assert!(!ids.contains("end"));
    }
}
