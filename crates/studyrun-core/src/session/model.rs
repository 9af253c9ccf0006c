//! Session domain model.
//!
//! `SessionState` is the single piece of mutable state a participant run owns.
//! Only the session engine mutates it; everything else sees snapshots.

use crate::block::BlockSequence;
use crate::error::{Result, StudyError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    Paused,
    /// Terminal.
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One participant's position in a block sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_id: String,
    pub study_id: String,
    pub status: SessionStatus,
    /// Index of the current block; equal to the sequence length once past the end.
    pub current_block_index: usize,
    #[serde(default)]
    pub completed_block_ids: BTreeSet<String>,
    #[serde(default)]
    pub total_pause_duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_save_timestamp: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>, study_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            study_id: study_id.into(),
            status: SessionStatus::Active,
            current_block_index: 0,
            completed_block_ids: BTreeSet::new(),
            total_pause_duration_ms: 0,
            paused_at_timestamp: None,
            last_save_timestamp: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn is_paused(&self) -> bool {
        self.status == SessionStatus::Paused
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// `active -> paused`.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<()> {
        if !self.is_active() {
            return Err(StudyError::invalid_state(format!(
                "cannot pause a {} session",
                self.status
            )));
        }
        self.status = SessionStatus::Paused;
        self.paused_at_timestamp = Some(now);
        Ok(())
    }

    /// `paused -> active`. Returns the pause length in milliseconds that was
    /// added to `total_pause_duration_ms`.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<u64> {
        if !self.is_paused() {
            return Err(StudyError::invalid_state(format!(
                "cannot resume a {} session",
                self.status
            )));
        }
        let elapsed_ms = self
            .paused_at_timestamp
            .take()
            .map(|paused_at| (now - paused_at).num_milliseconds().max(0) as u64)
            .unwrap_or(0);
        self.total_pause_duration_ms += elapsed_ms;
        self.status = SessionStatus::Active;
        Ok(elapsed_ms)
    }

    /// Records `block_id` as done and moves to `next_index`.
    pub fn record_advance(&mut self, block_id: &str, next_index: usize) {
        self.completed_block_ids.insert(block_id.to_string());
        self.current_block_index = next_index;
    }

    /// `* -> completed`. Any open pause is closed without being counted.
    pub fn complete(&mut self) {
        self.status = SessionStatus::Completed;
        self.paused_at_timestamp = None;
    }

    /// Verifies the state against the sequence it runs over.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::InvalidState` naming the first broken invariant.
    pub fn check_invariants(&self, sequence: &BlockSequence) -> Result<()> {
        if self.current_block_index > sequence.len() {
            return Err(StudyError::invalid_state(format!(
                "block index {} is past the end of a {}-block sequence",
                self.current_block_index,
                sequence.len()
            )));
        }

        let allowed = sequence.ids_before(self.current_block_index);
        if let Some(stray) = self
            .completed_block_ids
            .iter()
            .find(|id| !allowed.contains(id.as_str()))
        {
            return Err(StudyError::invalid_state(format!(
                "completed block '{}' is not before index {}",
                stray, self.current_block_index
            )));
        }

        if self.is_paused() && self.paused_at_timestamp.is_none() {
            return Err(StudyError::invalid_state(
                "paused session has no pause timestamp",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockType};
    use chrono::{Duration, TimeZone};

    fn sequence() -> BlockSequence {
        BlockSequence::new(vec![
            Block::new("welcome", BlockType::Welcome, 1),
            Block::new("q1", BlockType::YesNo, 2),
            Block::new("bye", BlockType::ThankYou, 3),
        ])
        .unwrap()
    }

    #[test]
    fn test_pause_resume_accumulates_exact_duration() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let mut state = SessionState::new("s1", "study");
        state.current_block_index = 1;

        state.pause(start).unwrap();
        assert!(state.is_paused());
        assert_eq!(state.paused_at_timestamp, Some(start));

        let added = state.resume(start + Duration::milliseconds(4_250)).unwrap();
        assert_eq!(added, 4_250);
        assert_eq!(state.total_pause_duration_ms, 4_250);
        assert_eq!(state.current_block_index, 1);
        assert!(state.paused_at_timestamp.is_none());
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        let now = Utc::now();
        let mut state = SessionState::new("s1", "study");
        assert!(state.resume(now).unwrap_err().is_invalid_state());

        state.complete();
        assert!(state.pause(now).unwrap_err().is_invalid_state());
    }

    #[test]
    fn test_invariants() {
        let seq = sequence();
        let mut state = SessionState::new("s1", "study");
        state.record_advance("welcome", 1);
        assert!(state.check_invariants(&seq).is_ok());

        state.record_advance("q1", 3);
        assert!(state.check_invariants(&seq).is_ok());

        state.current_block_index = 4;
        assert!(state.check_invariants(&seq).is_err());

        let mut stray = SessionState::new("s2", "study");
        stray.completed_block_ids.insert("bye".to_string());
        stray.current_block_index = 1;
        assert!(stray.check_invariants(&seq).is_err());

        let mut paused = SessionState::new("s3", "study");
        paused.status = SessionStatus::Paused;
        assert!(paused.check_invariants(&seq).is_err());
    }

    #[test]
    fn test_serializes_with_camel_case_keys() {
        let mut state = SessionState::new("s1", "study");
        state.record_advance("welcome", 1);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["currentBlockIndex"], 1);
        assert_eq!(json["status"], "active");
        assert_eq!(json["completedBlockIds"], serde_json::json!(["welcome"]));
        assert!(json.get("pausedAtTimestamp").is_none());
    }
}
