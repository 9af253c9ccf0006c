//! File-backed progress snapshots.
//!
//! ```text
//! data_dir/
//! ├── progress/<session>.json   # live, replaced on every save
//! └── archive/<session>.json    # moved here when the session completes
//! ```

use crate::paths::{StudyrunPaths, check_file_stem};
use crate::storage::AtomicJsonFile;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use studyrun_core::error::{Result, StudyError};
use studyrun_core::persistence::{ProgressSnapshot, ProgressStore};

pub struct FileProgressStore {
    progress_dir: PathBuf,
    archive_dir: PathBuf,
}

impl FileProgressStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            progress_dir: StudyrunPaths::progress_dir(data_dir),
            archive_dir: StudyrunPaths::archive_dir(data_dir),
        }
    }

    fn live_file(&self, session_id: &str) -> Result<AtomicJsonFile<ProgressSnapshot>> {
        check_file_stem("session", session_id).map_err(StudyError::persistence)?;
        Ok(AtomicJsonFile::new(
            self.progress_dir.join(format!("{}.json", session_id)),
        ))
    }

    pub fn archived_path(&self, session_id: &str) -> PathBuf {
        self.archive_dir.join(format!("{}.json", session_id))
    }
}

/// Runs blocking file work off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StudyError::internal(format!("file task failed: {}", e)))?
}

#[async_trait]
impl ProgressStore for FileProgressStore {
    async fn save_progress(&self, snapshot: &ProgressSnapshot) -> Result<()> {
        let file = self.live_file(&snapshot.session_id)?;
        let snapshot = snapshot.clone();
        blocking(move || {
            file.save(&snapshot)
                .map_err(|e| StudyError::persistence(format!("failed to save progress: {}", e)))
        })
        .await
    }

    async fn load_progress(&self, session_id: &str) -> Result<Option<ProgressSnapshot>> {
        let file = self.live_file(session_id).map_err(|e| StudyError::load(e.to_string()))?;
        blocking(move || {
            file.load()
                .map_err(|e| StudyError::load(format!("failed to read progress: {}", e)))
        })
        .await
    }

    async fn archive(&self, session_id: &str) -> Result<()> {
        let file = self.live_file(session_id)?;
        let destination = self.archived_path(session_id);
        let moved = blocking(move || {
            file.move_to(&destination)
                .map_err(|e| StudyError::persistence(format!("failed to archive progress: {}", e)))
        })
        .await?;

        if moved {
            tracing::info!("[FileProgressStore] Archived session {}", session_id);
        } else {
            tracing::debug!("[FileProgressStore] Nothing to archive for session {}", session_id);
        }
        Ok(())
    }
}
