//! AI follow-up boundary.
//!
//! Generating follow-up text is an external concern. The engine builds a
//! [`FollowUpRequest`] from earlier responses and accepts whatever question
//! comes back, or a static fallback when generation fails.

use crate::block::BlockType;
use crate::error::Result;
use crate::response::Payload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One earlier answer handed to the generator as context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpContext {
    pub block_id: String,
    pub block_type: BlockType,
    pub title: String,
    pub answer: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpRequest {
    pub session_id: String,
    pub block_id: String,
    /// Author-provided guidance (`prompt` setting), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub context: Vec<FollowUpContext>,
    pub max_questions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpSource {
    Generated,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpQuestion {
    pub text: String,
    pub source: FollowUpSource,
    #[serde(default)]
    pub metadata: Value,
}

impl FollowUpQuestion {
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: FollowUpSource::Generated,
            metadata: Value::Null,
        }
    }

    pub fn fallback(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: FollowUpSource::Fallback,
            metadata: Value::Null,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == FollowUpSource::Fallback
    }
}

/// Produces follow-up question text from earlier answers.
#[async_trait]
pub trait FollowUpGenerator: Send + Sync {
    async fn generate(&self, request: &FollowUpRequest) -> Result<FollowUpQuestion>;
}
