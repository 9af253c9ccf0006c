//! File-backed per-block response log.
//!
//! Each session gets an append-only `responses/<session>.jsonl`; one line per
//! accepted block. The store applies the completion policy itself, which is
//! what makes its `studyCompleted` answer authoritative.

use crate::paths::{StudyrunPaths, check_file_stem};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use studyrun_core::block::BlockType;
use studyrun_core::error::{Result, StudyError};
use studyrun_core::persistence::{BlockSubmission, SubmissionGateway, SubmissionReceipt};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub const COMPLETION_MESSAGE: &str = "Thank you for completing the study.";

/// The backend's completion rule: the last block, or any thank-you screen
/// wherever it sits, ends the study.
pub fn completes_study(submission: &BlockSubmission) -> bool {
    submission.is_last_block || submission.block_type == BlockType::ThankYou
}

pub(crate) fn receipt_for(study_completed: bool) -> SubmissionReceipt {
    let receipt = SubmissionReceipt::accepted(study_completed);
    if study_completed {
        receipt.with_message(COMPLETION_MESSAGE)
    } else {
        receipt
    }
}

/// One line of the response log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub submission: BlockSubmission,
    pub study_completed: bool,
    pub recorded_at: DateTime<Utc>,
}

pub struct FileSubmissionStore {
    responses_dir: PathBuf,
    // Serializes read-check-append so duplicates cannot slip in between.
    write_lock: Mutex<()>,
}

impl FileSubmissionStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            responses_dir: StudyrunPaths::responses_dir(data_dir.as_ref()),
            write_lock: Mutex::new(()),
        }
    }

    fn log_path(&self, session_id: &str) -> Result<PathBuf> {
        check_file_stem("session", session_id).map_err(StudyError::persistence)?;
        Ok(self.responses_dir.join(format!("{}.jsonl", session_id)))
    }

    /// Reads every record logged for a session, oldest first.
    pub async fn records(&self, session_id: &str) -> Result<Vec<SubmissionRecord>> {
        let path = self.log_path(session_id)?;
        if !fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).await?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StudyError::from))
            .collect()
    }

    async fn append(&self, path: &Path, record: &SubmissionRecord) -> Result<()> {
        fs::create_dir_all(&self.responses_dir).await?;

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.sync_data().await?;
        Ok(())
    }
}

#[async_trait]
impl SubmissionGateway for FileSubmissionStore {
    async fn submit_block(&self, submission: &BlockSubmission) -> Result<SubmissionReceipt> {
        let path = self.log_path(&submission.session_id)?;
        let _guard = self.write_lock.lock().await;

        let existing = self
            .records(&submission.session_id)
            .await
            .map_err(|e| StudyError::persistence(e.to_string()))?;
        if let Some(previous) = existing
            .iter()
            .find(|record| record.submission.block_id == submission.block_id)
        {
            tracing::debug!(
                "[FileSubmissionStore] Block {} already recorded for session {}",
                submission.block_id,
                submission.session_id
            );
            return Ok(receipt_for(previous.study_completed));
        }

        let record = SubmissionRecord {
            submission: submission.clone(),
            study_completed: completes_study(submission),
            recorded_at: Utc::now(),
        };
        self.append(&path, &record)
            .await
            .map_err(|e| StudyError::persistence(format!("failed to record response: {}", e)))?;

        tracing::debug!(
            "[FileSubmissionStore] Recorded block {} for session {} (completed={})",
            submission.block_id,
            submission.session_id,
            record.study_completed
        );
        Ok(receipt_for(record.study_completed))
    }

    async fn load_responses(&self, session_id: &str) -> Result<Vec<BlockSubmission>> {
        let records = self
            .records(session_id)
            .await
            .map_err(|e| StudyError::load(format!("failed to read responses: {}", e)))?;
        Ok(records.into_iter().map(|record| record.submission).collect())
    }
}
