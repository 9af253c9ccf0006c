//! Branch Resolver.
//!
//! Conditions are evaluated in declared order and the first match wins.
//! When nothing matches the block's default target is used; a missing default
//! is an authoring defect reported as `StudyError::BranchConfiguration`.

mod condition;

pub use condition::{BranchCondition, LogicType, answer_field};

use crate::block::{Block, BlockSequence};
use crate::capability::BlockCapability;
use crate::config::ValidationPolicy;
use crate::error::{Result, StudyError};
use crate::response::{Payload, ResponseSet};
use crate::validation::ValidationFinding;
use serde::{Deserialize, Serialize};

/// The branching part of a conditional block's settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchSettings {
    #[serde(default)]
    pub conditions: Vec<BranchCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_target_block_id: Option<String>,
}

impl BranchSettings {
    /// Reads branch settings out of a block's free-form settings.
    pub fn from_block(block: &Block) -> Result<Self> {
        serde_json::from_value(serde_json::Value::Object(block.settings.clone())).map_err(|e| {
            StudyError::branch_configuration(&block.id, format!("invalid branch settings: {}", e))
        })
    }
}

/// Resolves the next block id for a conditional block.
///
/// # Errors
///
/// Returns `StudyError::BranchConfiguration` if the settings cannot be read,
/// or if no condition matches and no default target is declared.
pub fn resolve(block: &Block, responses: &ResponseSet) -> Result<String> {
    let settings = BranchSettings::from_block(block)?;

    for condition in &settings.conditions {
        if condition.matches(responses.latest(&condition.source_block_id)) {
            tracing::debug!(
                "[BranchResolver] block={} condition={} matched -> {}",
                block.id,
                condition.id,
                condition.target_block_id
            );
            return Ok(condition.target_block_id.clone());
        }
    }

    match settings.default_target_block_id {
        Some(target) if !target.trim().is_empty() => {
            tracing::debug!(
                "[BranchResolver] block={} no condition matched -> default {}",
                block.id,
                target
            );
            Ok(target)
        }
        _ => Err(StudyError::branch_configuration(
            &block.id,
            "no condition matched and no default target is declared",
        )),
    }
}

/// Capability for `conditional_branch` blocks.
pub struct ConditionalBranchCapability;

impl BlockCapability for ConditionalBranchCapability {
    fn validate(&self, _: &Block, _: &Payload, _: &ValidationPolicy) -> Vec<ValidationFinding> {
        Vec::new()
    }

    fn resolve_next(&self, block: &Block, responses: &ResponseSet) -> Option<Result<String>> {
        Some(resolve(block, responses))
    }
}

/// A configuration problem found by [`lint_sequence`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchIssue {
    pub block_id: String,
    pub message: String,
}

/// Checks every conditional block of a sequence without running a session.
///
/// Branches may only jump forward; a target at or before the branch is
/// reported like an unknown one.
pub fn lint_sequence(sequence: &BlockSequence) -> Vec<BranchIssue> {
    let mut issues = Vec::new();

    for (position, block) in sequence.iter().enumerate() {
        if !block.block_type.is_conditional() {
            continue;
        }
        let mut report = |message: String| {
            issues.push(BranchIssue {
                block_id: block.id.clone(),
                message,
            })
        };

        let settings = match BranchSettings::from_block(block) {
            Ok(settings) => settings,
            Err(e) => {
                report(e.to_string());
                continue;
            }
        };

        match settings.default_target_block_id.as_deref() {
            None | Some("") => report("no default target declared".to_string()),
            Some(target) => match sequence.index_of(target) {
                None => report(format!("default target '{}' is not a block", target)),
                Some(index) if index <= position => report(format!(
                    "default target '{}' is not after the branch",
                    target
                )),
                Some(_) => {}
            },
        }

        for condition in &settings.conditions {
            match sequence.index_of(&condition.target_block_id) {
                None => report(format!(
                    "condition '{}' targets unknown block '{}'",
                    condition.id, condition.target_block_id
                )),
                Some(target) if target <= position => report(format!(
                    "condition '{}' targets block '{}' which is not after the branch",
                    condition.id, condition.target_block_id
                )),
                Some(_) => {}
            }
            match sequence.index_of(&condition.source_block_id) {
                None => report(format!(
                    "condition '{}' reads unknown block '{}'",
                    condition.id, condition.source_block_id
                )),
                Some(source) if source >= position => report(format!(
                    "condition '{}' reads block '{}' which comes after the branch",
                    condition.id, condition.source_block_id
                )),
                Some(_) => {}
            }
        }
    }

    issues
}
