//! Block domain model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Free-form block settings, as authored.
pub type BlockSettings = Map<String, Value>;

/// The fixed set of block types the engine knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Welcome,
    ThankYou,
    ContextScreen,
    OpenQuestion,
    SimpleInput,
    YesNo,
    MultipleChoice,
    OpinionScale,
    CardSort,
    TreeTest,
    ConditionalBranch,
    AiFollowup,
}

impl BlockType {
    pub const ALL: [BlockType; 12] = [
        BlockType::Welcome,
        BlockType::ThankYou,
        BlockType::ContextScreen,
        BlockType::OpenQuestion,
        BlockType::SimpleInput,
        BlockType::YesNo,
        BlockType::MultipleChoice,
        BlockType::OpinionScale,
        BlockType::CardSort,
        BlockType::TreeTest,
        BlockType::ConditionalBranch,
        BlockType::AiFollowup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Welcome => "welcome",
            BlockType::ThankYou => "thank_you",
            BlockType::ContextScreen => "context_screen",
            BlockType::OpenQuestion => "open_question",
            BlockType::SimpleInput => "simple_input",
            BlockType::YesNo => "yes_no",
            BlockType::MultipleChoice => "multiple_choice",
            BlockType::OpinionScale => "opinion_scale",
            BlockType::CardSort => "card_sort",
            BlockType::TreeTest => "tree_test",
            BlockType::ConditionalBranch => "conditional_branch",
            BlockType::AiFollowup => "ai_followup",
        }
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self, BlockType::ConditionalBranch)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of the interactive sequence.
///
/// Blocks are immutable once a session has loaded them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub order: i32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub settings: BlockSettings,
}

impl Block {
    pub fn new(id: impl Into<String>, block_type: BlockType, order: i32) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            block_type,
            order,
            description: None,
            is_required: false,
            settings: BlockSettings::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    pub fn setting_bool(&self, key: &str) -> Option<bool> {
        self.settings.get(key).and_then(Value::as_bool)
    }

    pub fn setting_u64(&self, key: &str) -> Option<u64> {
        self.settings.get(key).and_then(Value::as_u64)
    }

    pub fn setting_f64(&self, key: &str) -> Option<f64> {
        self.settings.get(key).and_then(Value::as_f64)
    }

    /// String entries of an array setting. Non-string entries are skipped,
    /// objects contribute their `id` field when present.
    pub fn setting_strings(&self, key: &str) -> Vec<String> {
        let Some(Value::Array(items)) = self.settings.get(key) else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(obj) => obj.get("id").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_deserializes_from_authoring_format() {
        let block: Block = serde_json::from_value(json!({
            "id": "q1",
            "type": "multiple_choice",
            "order": 2,
            "title": "Pick one",
            "isRequired": true,
            "settings": { "options": ["a", {"id": "b", "label": "B"}, 3] }
        }))
        .unwrap();

        assert_eq!(block.block_type, BlockType::MultipleChoice);
        assert!(block.is_required);
        assert_eq!(block.description, None);
        assert_eq!(block.setting_strings("options"), vec!["a", "b"]);
    }

    #[test]
    fn test_block_type_tags_round_trip_through_as_str() {
        for block_type in BlockType::ALL {
            let tag = serde_json::to_value(block_type).unwrap();
            assert_eq!(tag, json!(block_type.as_str()));
        }
    }
}
