//! Per-block-type validation rules.
//!
//! Each rule set checks its fields in declaration order, so findings come
//! back in a stable order.

use super::ValidationFinding;
use crate::block::Block;
use crate::capability::BlockCapability;
use crate::config::ValidationPolicy;
use crate::response::{Payload, yes_no_answer};
use serde_json::Value;
use std::collections::HashSet;

pub(crate) const TEXT_FIELD: &str = "text";
pub(crate) const VALUE_FIELD: &str = "value";
pub(crate) const ANSWER_FIELD: &str = "answer";
pub(crate) const SELECTED_FIELD: &str = "selected";
pub(crate) const PLACEMENTS_FIELD: &str = "placements";
pub(crate) const SELECTED_NODE_FIELD: &str = "selectedNode";

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

/// Selected option ids, accepting either a single string or an array.
fn selections(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::Number(n)) => vec![n.to_string()],
        _ => Vec::new(),
    }
}

/// Welcome, thank-you and context screens accept anything.
pub struct PassiveRules;

impl BlockCapability for PassiveRules {
    fn validate(&self, _: &Block, _: &Payload, _: &ValidationPolicy) -> Vec<ValidationFinding> {
        Vec::new()
    }
}

/// Open-ended text (`open_question`, `ai_followup`).
pub struct OpenTextRules;

impl BlockCapability for OpenTextRules {
    fn validate(
        &self,
        block: &Block,
        payload: &Payload,
        policy: &ValidationPolicy,
    ) -> Vec<ValidationFinding> {
        let text = payload
            .get(TEXT_FIELD)
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or("");

        if text.is_empty() {
            if block.is_required {
                return vec![ValidationFinding::error(
                    TEXT_FIELD,
                    "This question requires an answer",
                )];
            }
            return Vec::new();
        }

        let min_length = block
            .setting_u64("minLength")
            .map(|n| n as usize)
            .unwrap_or(policy.min_open_text_length);

        if text.chars().count() < min_length {
            return vec![ValidationFinding::warning(
                TEXT_FIELD,
                format!("Answer is shorter than {} characters", min_length),
            )];
        }

        Vec::new()
    }
}

/// Free-form single value input.
pub struct FreeInputRules;

impl BlockCapability for FreeInputRules {
    fn validate(&self, block: &Block, payload: &Payload, _: &ValidationPolicy) -> Vec<ValidationFinding> {
        if block.is_required && is_blank(payload.get(VALUE_FIELD)) {
            return vec![ValidationFinding::error(VALUE_FIELD, "This field is required")];
        }
        Vec::new()
    }
}

/// Two-option single select.
pub struct YesNoRules;

impl BlockCapability for YesNoRules {
    fn validate(&self, _: &Block, payload: &Payload, _: &ValidationPolicy) -> Vec<ValidationFinding> {
        if payload.get(ANSWER_FIELD).and_then(yes_no_answer).is_some() {
            Vec::new()
        } else {
            vec![ValidationFinding::error(ANSWER_FIELD, "Please select an option")]
        }
    }
}

/// Single or multi select over declared `options`.
pub struct ChoiceRules;

impl BlockCapability for ChoiceRules {
    fn validate(&self, block: &Block, payload: &Payload, _: &ValidationPolicy) -> Vec<ValidationFinding> {
        let selected = selections(payload.get(SELECTED_FIELD));
        if selected.is_empty() {
            return vec![ValidationFinding::error(
                SELECTED_FIELD,
                "Please select an option",
            )];
        }

        let mut findings = Vec::new();
        let allow_multiple = block.setting_bool("allowMultiple").unwrap_or(false);
        if !allow_multiple && selected.len() > 1 {
            findings.push(ValidationFinding::error(
                SELECTED_FIELD,
                "Only one option may be selected",
            ));
        }

        let options = block.setting_strings("options");
        if !options.is_empty() {
            let known: HashSet<&str> = options.iter().map(String::as_str).collect();
            let unknown: Vec<&str> = selected
                .iter()
                .map(String::as_str)
                .filter(|s| !known.contains(s))
                .collect();
            if !unknown.is_empty() {
                findings.push(ValidationFinding::error(
                    SELECTED_FIELD,
                    format!("Unknown option(s): {}", unknown.join(", ")),
                ));
            }
        }

        if allow_multiple {
            if let Some(min) = block.setting_u64("minSelections") {
                if (selected.len() as u64) < min {
                    findings.push(ValidationFinding::error(
                        SELECTED_FIELD,
                        format!("Select at least {} options", min),
                    ));
                }
            }
            if let Some(max) = block.setting_u64("maxSelections") {
                if (selected.len() as u64) > max {
                    findings.push(ValidationFinding::error(
                        SELECTED_FIELD,
                        format!("Select at most {} options", max),
                    ));
                }
            }
        }

        findings
    }
}

/// Numeric / opinion scale.
pub struct ScaleRules;

impl BlockCapability for ScaleRules {
    fn validate(&self, block: &Block, payload: &Payload, _: &ValidationPolicy) -> Vec<ValidationFinding> {
        let Some(value) = payload.get(VALUE_FIELD).and_then(Value::as_f64) else {
            return vec![ValidationFinding::error(VALUE_FIELD, "Please choose a value")];
        };

        let min = block.setting_f64("min").unwrap_or(1.0);
        let max = block.setting_f64("max").unwrap_or(5.0);
        if value < min || value > max {
            return vec![ValidationFinding::error(
                VALUE_FIELD,
                format!("Value must be between {} and {}", min, max),
            )];
        }
        Vec::new()
    }
}

/// Card sort: `placements` maps card id to category.
pub struct CardSortRules;

impl BlockCapability for CardSortRules {
    fn validate(&self, block: &Block, payload: &Payload, _: &ValidationPolicy) -> Vec<ValidationFinding> {
        let placements = match payload.get(PLACEMENTS_FIELD) {
            Some(Value::Object(map)) if !map.is_empty() => map,
            _ => {
                return vec![ValidationFinding::error(
                    PLACEMENTS_FIELD,
                    "Sort at least one card",
                )];
            }
        };

        let unsorted = block
            .setting_strings("cards")
            .into_iter()
            .filter(|card| is_blank(placements.get(card)))
            .count();
        if unsorted > 0 {
            return vec![ValidationFinding::warning(
                PLACEMENTS_FIELD,
                format!("{} card(s) were left unsorted", unsorted),
            )];
        }
        Vec::new()
    }
}

/// Tree test: a node must be chosen.
pub struct TreeTestRules;

impl BlockCapability for TreeTestRules {
    fn validate(&self, _: &Block, payload: &Payload, _: &ValidationPolicy) -> Vec<ValidationFinding> {
        if is_blank(payload.get(SELECTED_NODE_FIELD)) {
            return vec![ValidationFinding::error(
                SELECTED_NODE_FIELD,
                "Please choose where you would find it",
            )];
        }
        Vec::new()
    }
}
