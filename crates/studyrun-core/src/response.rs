//! Participant responses.

use crate::block::BlockType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw answer data as submitted by the presentation layer.
pub type Payload = Map<String, Value>;

/// The recorded answer to one completed block. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub block_id: String,
    pub block_type: BlockType,
    pub payload: Payload,
    pub time_spent_seconds: u64,
    pub interaction_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Response {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }
}

/// Append-only set of a session's responses.
///
/// Entries are never replaced; lookups by block id return the most recent one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseSet {
    responses: Vec<Response>,
}

impl ResponseSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, response: Response) {
        self.responses.push(response);
    }

    /// The most recent response for `block_id`.
    pub fn latest(&self, block_id: &str) -> Option<&Response> {
        self.responses.iter().rev().find(|r| r.block_id == block_id)
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Response> {
        self.responses.iter()
    }
}

impl FromIterator<Response> for ResponseSet {
    fn from_iter<I: IntoIterator<Item = Response>>(iter: I) -> Self {
        Self {
            responses: iter.into_iter().collect(),
        }
    }
}

/// Builds a payload from `(field, value)` pairs.
pub fn payload<I, K>(fields: I) -> Payload
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    fields.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Reads a yes/no answer: a boolean, or one of `yes`, `no`, `true`, `false`
/// in any case.
pub fn yes_no_answer(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "yes" | "true" => Some(true),
            "no" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(block_id: &str, answer: &str) -> Response {
        Response {
            block_id: block_id.to_string(),
            block_type: BlockType::OpenQuestion,
            payload: payload([("text", json!(answer))]),
            time_spent_seconds: 3,
            interaction_count: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_latest_prefers_most_recent_entry() {
        let mut set = ResponseSet::new();
        set.push(response("a", "first"));
        set.push(response("b", "other"));
        set.push(response("a", "second"));

        assert_eq!(set.len(), 3);
        assert_eq!(set.latest("a").unwrap().field("text"), Some(&json!("second")));
        assert!(set.latest("missing").is_none());
    }

    #[test]
    fn test_yes_no_answer_spellings() {
        assert_eq!(yes_no_answer(&json!(true)), Some(true));
        assert_eq!(yes_no_answer(&json!(" YES ")), Some(true));
        assert_eq!(yes_no_answer(&json!("True")), Some(true));
        assert_eq!(yes_no_answer(&json!("no")), Some(false));
        assert_eq!(yes_no_answer(&json!("false")), Some(false));
        assert_eq!(yes_no_answer(&json!("maybe")), None);
        assert_eq!(yes_no_answer(&json!(1)), None);
    }
}
