//! Boundary payloads exchanged with the external store.

use crate::analytics::AnalyticsEvent;
use crate::block::BlockType;
use crate::response::Payload;
use crate::session::SessionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Context sent alongside a per-block submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMetadata {
    pub study_id: String,
    pub block_index: usize,
    pub time_spent_seconds: u64,
    pub total_pause_duration_ms: u64,
}

/// Per-block save request.
///
/// `is_last_block` is a locally computed hint; the store decides completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSubmission {
    pub session_id: String,
    pub block_id: String,
    pub block_type: BlockType,
    pub response: Payload,
    pub is_last_block: bool,
    pub metadata: SubmissionMetadata,
    pub start_time: DateTime<Utc>,
    pub interaction_count: u32,
    #[serde(default)]
    pub analytics: Vec<AnalyticsEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptData {
    /// Authoritative completion flag. `None` when the store did not say.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_message: Option<String>,
}

/// Per-block save response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub success: bool,
    #[serde(default)]
    pub data: ReceiptData,
}

impl SubmissionReceipt {
    pub fn accepted(study_completed: bool) -> Self {
        Self {
            success: true,
            data: ReceiptData {
                study_completed: Some(study_completed),
                completion_message: None,
            },
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.data.completion_message = Some(message.into());
        self
    }

    pub fn study_completed(&self) -> Option<bool> {
        self.data.study_completed
    }
}

/// Progress auto-save payload. Carries session state only, never responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub session_id: String,
    pub current_block_index: usize,
    pub completed_blocks: Vec<String>,
    pub session_state: SessionState,
    pub last_save_time: DateTime<Utc>,
}

impl ProgressSnapshot {
    pub fn capture(state: &SessionState, now: DateTime<Utc>) -> Self {
        let mut session_state = state.clone();
        session_state.last_save_timestamp = Some(now);
        Self {
            session_id: state.session_id.clone(),
            current_block_index: state.current_block_index,
            completed_blocks: state.completed_block_ids.iter().cloned().collect(),
            session_state,
            last_save_time: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_receipt_without_completion_flag() {
        let receipt: SubmissionReceipt =
            serde_json::from_value(json!({"success": true, "data": {}})).unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.study_completed(), None);

        let bare: SubmissionReceipt = serde_json::from_value(json!({"success": false})).unwrap();
        assert!(!bare.success);
    }

    #[test]
    fn test_receipt_wire_format() {
        let receipt = SubmissionReceipt::accepted(true).with_message("Thanks!");
        assert_eq!(
            serde_json::to_value(&receipt).unwrap(),
            json!({"success": true, "data": {"studyCompleted": true, "completionMessage": "Thanks!"}})
        );
    }

    #[test]
    fn test_snapshot_capture() {
        let mut state = SessionState::new("s1", "study");
        state.record_advance("welcome", 1);
        let now = Utc::now();
        let snapshot = ProgressSnapshot::capture(&state, now);

        assert_eq!(snapshot.current_block_index, 1);
        assert_eq!(snapshot.completed_blocks, vec!["welcome".to_string()]);
        assert_eq!(snapshot.session_state.last_save_timestamp, Some(now));
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("completedBlocks").is_some());
        assert!(json.get("lastSaveTime").is_some());
    }
}
