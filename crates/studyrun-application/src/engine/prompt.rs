//! Follow-up prompts for `ai_followup` blocks.

use super::SessionEngine;
use studyrun_core::block::BlockType;
use studyrun_core::error::{Result, StudyError};
use studyrun_core::followup::{FollowUpContext, FollowUpQuestion, FollowUpRequest};

impl SessionEngine {
    /// Produces the question to show on the current `ai_followup` block.
    ///
    /// Context comes from the blocks listed in the `sourceBlockIds` setting,
    /// or from every earlier response when the setting is absent. Generator
    /// failures fall back to the configured static prompt.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::InvalidState` if the current block is not an
    /// `ai_followup` block.
    pub async fn follow_up_prompt(&self) -> Result<FollowUpQuestion> {
        let request = {
            let inner = self.inner.lock().await;
            let block = self
                .sequence
                .get(inner.session.current_block_index)
                .filter(|block| block.block_type == BlockType::AiFollowup)
                .ok_or_else(|| {
                    StudyError::invalid_state("current block is not an ai_followup block")
                })?;

            let sources = block.setting_strings("sourceBlockIds");
            let picked: Vec<_> = if sources.is_empty() {
                inner.responses.iter().collect()
            } else {
                sources
                    .iter()
                    .filter_map(|id| inner.responses.latest(id))
                    .collect()
            };

            let context = picked
                .into_iter()
                .map(|response| FollowUpContext {
                    block_id: response.block_id.clone(),
                    block_type: response.block_type,
                    title: self
                        .sequence
                        .by_id(&response.block_id)
                        .map(|b| b.title.clone())
                        .unwrap_or_default(),
                    answer: response.payload.clone(),
                })
                .collect();

            FollowUpRequest {
                session_id: inner.session.session_id.clone(),
                block_id: block.id.clone(),
                instructions: block
                    .setting("prompt")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                context,
                max_questions: block
                    .setting_u64("maxQuestions")
                    .map(|n| n as usize)
                    .unwrap_or(self.config.followup_max_questions),
            }
        };

        Ok(self.followups.ask(&request).await)
    }
}
