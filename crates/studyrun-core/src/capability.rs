//! Per-block-type capabilities.
//!
//! Every block type maps to exactly one `BlockCapability` implementation.
//! All types can validate a payload; conditional branches can also pick the
//! next block.

use crate::block::{Block, BlockType};
use crate::branch::ConditionalBranchCapability;
use crate::config::ValidationPolicy;
use crate::error::Result;
use crate::response::{Payload, ResponseSet};
use crate::validation::{
    CardSortRules, ChoiceRules, FreeInputRules, OpenTextRules, PassiveRules, ScaleRules,
    TreeTestRules, ValidationFinding, YesNoRules,
};

pub trait BlockCapability: Send + Sync {
    /// Checks a submitted payload. Findings are ordered by field declaration.
    fn validate(
        &self,
        block: &Block,
        payload: &Payload,
        policy: &ValidationPolicy,
    ) -> Vec<ValidationFinding>;

    /// Picks the id of the next block from prior responses.
    ///
    /// `None` means the block has no branching capability and the session
    /// advances sequentially.
    fn resolve_next(&self, _block: &Block, _responses: &ResponseSet) -> Option<Result<String>> {
        None
    }
}

/// Returns the capability implementation for a block type.
pub fn capability_for(block_type: BlockType) -> &'static dyn BlockCapability {
    match block_type {
        BlockType::Welcome | BlockType::ThankYou | BlockType::ContextScreen => &PassiveRules,
        BlockType::OpenQuestion | BlockType::AiFollowup => &OpenTextRules,
        BlockType::SimpleInput => &FreeInputRules,
        BlockType::YesNo => &YesNoRules,
        BlockType::MultipleChoice => &ChoiceRules,
        BlockType::OpinionScale => &ScaleRules,
        BlockType::CardSort => &CardSortRules,
        BlockType::TreeTest => &TreeTestRules,
        BlockType::ConditionalBranch => &ConditionalBranchCapability,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_conditional_branch_resolves() {
        let responses = ResponseSet::new();
        for block_type in BlockType::ALL {
            let block = Block::new("b", block_type, 1);
            let resolved = capability_for(block_type).resolve_next(&block, &responses);
            assert_eq!(resolved.is_some(), block_type.is_conditional(), "{block_type}");
        }
    }
}
