//! Branch conditions and their predicates.

use crate::block::BlockType;
use crate::response::{Response, yes_no_answer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogicType {
    Equals,
    Contains,
    GreaterThan,
    LessThan,
    IncludesAny,
    TimeSpentGreater,
}

/// A rule mapping a prior response to a target block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchCondition {
    pub id: String,
    pub logic_type: LogicType,
    pub source_block_id: String,
    pub comparison_value: Value,
    pub target_block_id: String,
    /// Payload field to compare. Defaults to the source block type's answer field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl BranchCondition {
    /// Evaluates the predicate against the source block's response.
    ///
    /// A missing response or field evaluates to `false`.
    pub fn matches(&self, response: Option<&Response>) -> bool {
        let Some(response) = response else {
            return false;
        };

        if self.logic_type == LogicType::TimeSpentGreater {
            return as_number(&self.comparison_value)
                .is_some_and(|threshold| response.time_spent_seconds as f64 > threshold);
        }

        let field = self
            .field
            .as_deref()
            .or_else(|| answer_field(response.block_type));
        let Some(actual) = field.and_then(|f| response.payload.get(f)) else {
            return false;
        };

        match self.logic_type {
            LogicType::Equals => values_equal(actual, &self.comparison_value),
            LogicType::Contains => contains(actual, &self.comparison_value),
            LogicType::GreaterThan => compare(actual, &self.comparison_value)
                .is_some_and(|(a, b)| a > b),
            LogicType::LessThan => compare(actual, &self.comparison_value)
                .is_some_and(|(a, b)| a < b),
            LogicType::IncludesAny => includes_any(actual, &self.comparison_value),
            LogicType::TimeSpentGreater => false,
        }
    }
}

/// The payload field holding a block type's main answer.
pub fn answer_field(block_type: BlockType) -> Option<&'static str> {
    match block_type {
        BlockType::OpenQuestion | BlockType::AiFollowup => Some("text"),
        BlockType::SimpleInput | BlockType::OpinionScale => Some("value"),
        BlockType::YesNo => Some("answer"),
        BlockType::MultipleChoice => Some("selected"),
        BlockType::TreeTest => Some("selectedNode"),
        BlockType::CardSort => Some("placements"),
        BlockType::Welcome
        | BlockType::ThankYou
        | BlockType::ContextScreen
        | BlockType::ConditionalBranch => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Lowercased text; yes/no spellings collapse to `yes` or `no`.
fn as_text(value: &Value) -> Option<String> {
    if let Some(answer) = yes_no_answer(value) {
        return Some(if answer { "yes" } else { "no" }.to_string());
    }
    match value {
        Value::String(s) => Some(s.trim().to_lowercase()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    if let (Value::Number(_), Some(a), Some(b)) = (actual, as_number(actual), as_number(expected)) {
        return a == b;
    }
    match (as_text(actual), as_text(expected)) {
        (Some(a), Some(b)) => a == b,
        _ => actual == expected,
    }
}

fn contains(actual: &Value, needle: &Value) -> bool {
    match actual {
        Value::Array(items) => items.iter().any(|item| values_equal(item, needle)),
        _ => match (as_text(actual), as_text(needle)) {
            (Some(haystack), Some(needle)) => haystack.contains(&needle),
            _ => false,
        },
    }
}

fn compare(actual: &Value, expected: &Value) -> Option<(f64, f64)> {
    Some((as_number(actual)?, as_number(expected)?))
}

fn as_members(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn includes_any(actual: &Value, expected: &Value) -> bool {
    let candidates = as_members(expected);
    as_members(actual)
        .into_iter()
        .any(|member| candidates.iter().any(|c| values_equal(member, c)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::payload;
    use chrono::Utc;
    use serde_json::json;

    fn response(block_type: BlockType, fields: serde_json::Value, secs: u64) -> Response {
        let serde_json::Value::Object(map) = fields else {
            panic!("fields must be an object");
        };
        Response {
            block_id: "src".to_string(),
            block_type,
            payload: map,
            time_spent_seconds: secs,
            interaction_count: 0,
            created_at: Utc::now(),
        }
    }

    fn condition(logic_type: LogicType, value: serde_json::Value) -> BranchCondition {
        BranchCondition {
            id: "c".to_string(),
            logic_type,
            source_block_id: "src".to_string(),
            comparison_value: value,
            target_block_id: "t".to_string(),
            field: None,
        }
    }

    #[test]
    fn test_missing_response_is_false() {
        assert!(!condition(LogicType::Equals, json!("x")).matches(None));
    }

    #[test]
    fn test_equals_normalizes_yes_no() {
        let r = response(BlockType::YesNo, json!({"answer": true}), 1);
        assert!(condition(LogicType::Equals, json!("yes")).matches(Some(&r)));
        assert!(!condition(LogicType::Equals, json!("no")).matches(Some(&r)));

        let r = response(BlockType::YesNo, json!({"answer": "Yes"}), 1);
        assert!(condition(LogicType::Equals, json!(true)).matches(Some(&r)));

        let r = response(BlockType::YesNo, json!({"answer": "true"}), 1);
        assert!(condition(LogicType::Equals, json!("yes")).matches(Some(&r)));
        assert!(condition(LogicType::Equals, json!("TRUE")).matches(Some(&r)));
        assert!(!condition(LogicType::Equals, json!("false")).matches(Some(&r)));
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let r = response(BlockType::OpenQuestion, json!({"text": "The Checkout was slow"}), 1);
        assert!(condition(LogicType::Contains, json!("checkout")).matches(Some(&r)));
        assert!(!condition(LogicType::Contains, json!("login")).matches(Some(&r)));
    }

    #[test]
    fn test_numeric_comparisons() {
        let r = response(BlockType::OpinionScale, json!({"value": 7}), 1);
        assert!(condition(LogicType::GreaterThan, json!(6)).matches(Some(&r)));
        assert!(!condition(LogicType::GreaterThan, json!(7)).matches(Some(&r)));
        assert!(condition(LogicType::LessThan, json!("7.5")).matches(Some(&r)));
        assert!(!condition(LogicType::LessThan, json!("n/a")).matches(Some(&r)));
    }

    #[test]
    fn test_includes_any_over_selections() {
        let r = response(BlockType::MultipleChoice, json!({"selected": ["a", "c"]}), 1);
        assert!(condition(LogicType::IncludesAny, json!(["b", "c"])).matches(Some(&r)));
        assert!(!condition(LogicType::IncludesAny, json!(["b", "d"])).matches(Some(&r)));
        assert!(condition(LogicType::IncludesAny, json!("a")).matches(Some(&r)));
    }

    #[test]
    fn test_time_spent_greater() {
        let r = response(BlockType::OpenQuestion, json!({}), 45);
        assert!(condition(LogicType::TimeSpentGreater, json!(30)).matches(Some(&r)));
        assert!(!condition(LogicType::TimeSpentGreater, json!(45)).matches(Some(&r)));
    }

    #[test]
    fn test_explicit_field_overrides_answer_field() {
        let r = Response {
            payload: payload([("text", json!("hello")), ("mood", json!("happy"))]),
            ..response(BlockType::OpenQuestion, json!({}), 1)
        };
        let mut c = condition(LogicType::Equals, json!("happy"));
        assert!(!c.matches(Some(&r)));
        c.field = Some("mood".to_string());
        assert!(c.matches(Some(&r)));
    }
}
