//! Response validation.
//!
//! Validation is a pure function of (block, payload, policy). It produces
//! findings, never errors: `error` findings block progression, `warning`
//! findings are informational.

mod rules;

pub use rules::{
    CardSortRules, ChoiceRules, FreeInputRules, OpenTextRules, PassiveRules, ScaleRules,
    TreeTestRules, YesNoRules,
};

use crate::block::Block;
use crate::capability::capability_for;
use crate::config::ValidationPolicy;
use crate::response::Payload;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One problem found in a submitted payload. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

impl ValidationFinding {
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// True if any finding has `error` severity.
pub fn has_errors(findings: &[ValidationFinding]) -> bool {
    findings.iter().any(ValidationFinding::is_error)
}

/// Validates `payload` against the rules of the block's type.
pub fn validate(
    block: &Block,
    payload: &Payload,
    policy: &ValidationPolicy,
) -> Vec<ValidationFinding> {
    capability_for(block.block_type).validate(block, payload, policy)
}
