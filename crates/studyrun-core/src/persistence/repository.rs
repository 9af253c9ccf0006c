//! Persistence boundary traits.

use super::model::{BlockSubmission, ProgressSnapshot, SubmissionReceipt};
use crate::error::Result;
use async_trait::async_trait;

/// Receives per-block saves.
///
/// Implementations report transport or storage failures as
/// `StudyError::Persistence`. Submitting the same payload twice must yield
/// the same `study_completed` answer.
#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    async fn submit_block(&self, submission: &BlockSubmission) -> Result<SubmissionReceipt>;

    /// Every submission accepted for the session, oldest first.
    async fn load_responses(&self, session_id: &str) -> Result<Vec<BlockSubmission>>;
}

/// Stores session progress snapshots (last write wins).
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Replaces the stored snapshot for the session.
    async fn save_progress(&self, snapshot: &ProgressSnapshot) -> Result<()>;

    /// Returns the latest snapshot, or `None` if the session was never saved.
    async fn load_progress(&self, session_id: &str) -> Result<Option<ProgressSnapshot>>;

    /// Moves a finished session's snapshot out of the live set.
    async fn archive(&self, session_id: &str) -> Result<()>;
}
