//! In-memory backend.
//!
//! Implements every boundary trait over maps guarded by a tokio mutex. Useful
//! for dry runs and for exercising the engine without touching the disk.

use crate::file_submission_store::{completes_study, receipt_for};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use studyrun_core::block::{Block, BlockSource};
use studyrun_core::error::{Result, StudyError};
use studyrun_core::persistence::{
    BlockSubmission, ProgressSnapshot, ProgressStore, SubmissionGateway, SubmissionReceipt,
};
use tokio::sync::Mutex;

#[derive(Default)]
struct MemoryState {
    studies: HashMap<String, Vec<Block>>,
    submissions: Vec<(BlockSubmission, bool)>,
    progress: HashMap<String, ProgressSnapshot>,
    archived: HashMap<String, ProgressSnapshot>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_study(&self, study_id: impl Into<String>, blocks: Vec<Block>) {
        self.state.lock().await.studies.insert(study_id.into(), blocks);
    }

    /// Accepted submissions in arrival order (duplicates excluded).
    pub async fn submissions(&self) -> Vec<BlockSubmission> {
        let state = self.state.lock().await;
        state.submissions.iter().map(|(s, _)| s.clone()).collect()
    }

    pub async fn progress(&self, session_id: &str) -> Option<ProgressSnapshot> {
        self.state.lock().await.progress.get(session_id).cloned()
    }

    pub async fn archived(&self, session_id: &str) -> Option<ProgressSnapshot> {
        self.state.lock().await.archived.get(session_id).cloned()
    }
}

#[async_trait]
impl BlockSource for MemoryStore {
    async fn fetch_blocks(&self, study_id: &str) -> Result<Vec<Block>> {
        self.state
            .lock()
            .await
            .studies
            .get(study_id)
            .cloned()
            .ok_or_else(|| StudyError::load(format!("study '{}' not found", study_id)))
    }
}

#[async_trait]
impl SubmissionGateway for MemoryStore {
    async fn submit_block(&self, submission: &BlockSubmission) -> Result<SubmissionReceipt> {
        let mut state = self.state.lock().await;
        let previous = state.submissions.iter().find(|(s, _)| {
            s.session_id == submission.session_id && s.block_id == submission.block_id
        });
        if let Some((_, completed)) = previous {
            return Ok(receipt_for(*completed));
        }

        let completed = completes_study(submission);
        state.submissions.push((submission.clone(), completed));
        Ok(receipt_for(completed))
    }

    async fn load_responses(&self, session_id: &str) -> Result<Vec<BlockSubmission>> {
        Ok(self
            .state
            .lock()
            .await
            .submissions
            .iter()
            .filter(|(s, _)| s.session_id == session_id)
            .map(|(s, _)| s.clone())
            .collect())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn save_progress(&self, snapshot: &ProgressSnapshot) -> Result<()> {
        self.state
            .lock()
            .await
            .progress
            .insert(snapshot.session_id.clone(), snapshot.clone());
        Ok(())
    }

    async fn load_progress(&self, session_id: &str) -> Result<Option<ProgressSnapshot>> {
        Ok(self.progress(session_id).await)
    }

    async fn archive(&self, session_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(snapshot) = state.progress.remove(session_id) {
            state.archived.insert(session_id.to_string(), snapshot);
        }
        Ok(())
    }
}
