//! Persistence Gateway.
//!
//! Two write paths share this type:
//! - per-block saves, issued from `advance()`; failures propagate.
//! - progress saves, issued on block transitions and by the auto-save timer;
//!   failures are logged and swallowed.
//!
//! Each path has its own in-flight guard. A per-block save that finds one
//! already running is rejected with `SaveInFlight`; a timer tick that finds a
//! progress save running is skipped, not queued.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use studyrun_core::clock::Clock;
use studyrun_core::error::{Result, StudyError};
use studyrun_core::persistence::{
    BlockSubmission, ProgressSnapshot, ProgressStore, SubmissionGateway, SubmissionReceipt,
};
use studyrun_core::session::SessionState;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Result of a best-effort progress save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSave {
    Saved(DateTime<Utc>),
    /// Another progress save was still in flight.
    Skipped,
    Failed,
}

pub struct PersistenceGateway {
    submissions: Arc<dyn SubmissionGateway>,
    progress: Arc<dyn ProgressStore>,
    clock: Arc<dyn Clock>,
    block_save: Mutex<()>,
    progress_save: Mutex<()>,
}

impl PersistenceGateway {
    pub fn new(
        submissions: Arc<dyn SubmissionGateway>,
        progress: Arc<dyn ProgressStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            submissions,
            progress,
            clock,
            block_save: Mutex::new(()),
            progress_save: Mutex::new(()),
        }
    }

    pub fn progress_store(&self) -> &Arc<dyn ProgressStore> {
        &self.progress
    }

    /// Per-block save. Never retried here.
    ///
    /// # Errors
    ///
    /// - `StudyError::SaveInFlight` if another per-block save is running
    /// - `StudyError::Persistence` if the store fails or rejects the block
    pub async fn save_block(&self, submission: &BlockSubmission) -> Result<SubmissionReceipt> {
        let _in_flight = self
            .block_save
            .try_lock()
            .map_err(|_| StudyError::SaveInFlight)?;

        tracing::debug!(
            "[PersistenceGateway] Saving block {} (session={}, last={})",
            submission.block_id,
            submission.session_id,
            submission.is_last_block
        );

        let receipt = self
            .submissions
            .submit_block(submission)
            .await
            .map_err(|e| match e {
                StudyError::Persistence(_) => e,
                other => StudyError::persistence(other.to_string()),
            })?;

        if !receipt.success {
            return Err(StudyError::persistence(format!(
                "store rejected block '{}'",
                submission.block_id
            )));
        }
        Ok(receipt)
    }

    /// Progress save for a state transition. Waits for a running save to finish.
    pub async fn save_progress(&self, state: &SessionState) -> ProgressSave {
        let _in_flight = self.progress_save.lock().await;
        self.write_progress(state).await
    }

    /// Progress save for a timer tick. Skipped while another one is running.
    pub async fn autosave_tick(&self, state: &SessionState) -> ProgressSave {
        let Ok(_in_flight) = self.progress_save.try_lock() else {
            tracing::debug!(target: "autosave", "Previous save still in flight, skipping tick");
            return ProgressSave::Skipped;
        };
        self.write_progress(state).await
    }

    async fn write_progress(&self, state: &SessionState) -> ProgressSave {
        let snapshot = ProgressSnapshot::capture(state, self.clock.now());
        match self.progress.save_progress(&snapshot).await {
            Ok(()) => {
                tracing::debug!(
                    "[PersistenceGateway] Progress saved (session={}, index={})",
                    snapshot.session_id,
                    snapshot.current_block_index
                );
                ProgressSave::Saved(snapshot.last_save_time)
            }
            Err(e) => {
                tracing::warn!(
                    "[PersistenceGateway] Progress save failed for session {}: {}",
                    snapshot.session_id,
                    e
                );
                ProgressSave::Failed
            }
        }
    }

    /// Spawns the recurring auto-save task.
    ///
    /// Each tick saves the latest state published on `state_rx`. The first
    /// tick fires one `period` after start.
    pub fn start_autosave(
        self: &Arc<Self>,
        state_rx: watch::Receiver<SessionState>,
        period: Duration,
    ) -> AutosaveHandle {
        let token = CancellationToken::new();
        let gateway = Arc::clone(self);
        let task_token = token.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(target: "autosave", "Scheduler started ({:?} interval)", period);

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let state = state_rx.borrow().clone();
                tracing::debug!(
                    target: "autosave",
                    "Tick (session={}, index={})",
                    state.session_id,
                    state.current_block_index
                );

                // cancellation also drops a save that is still pending
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = gateway.autosave_tick(&state) => {}
                }
            }

            tracing::info!(target: "autosave", "Scheduler stopped");
        });

        AutosaveHandle { token, task }
    }
}

/// Owns the auto-save task. Dropping the handle cancels the task.
pub struct AutosaveHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    /// Cancels the timer and any pending auto-save, then waits for the task to end.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(target: "autosave", "Scheduler task ended abnormally: {}", e);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use studyrun_core::block::BlockType;
    use studyrun_core::clock::SystemClock;
    use studyrun_core::persistence::SubmissionMetadata;
    use studyrun_core::response::Payload;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct CountingStore {
        saves: AtomicUsize,
        release: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl ProgressStore for CountingStore {
        async fn save_progress(&self, _snapshot: &ProgressSnapshot) -> Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if let Some(release) = &self.release {
                release.notified().await;
            }
            Ok(())
        }

        async fn load_progress(&self, _session_id: &str) -> Result<Option<ProgressSnapshot>> {
            Ok(None)
        }

        async fn archive(&self, _session_id: &str) -> Result<()> {
            Ok(())
        }
    }

    struct RejectingGateway {
        success: bool,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl SubmissionGateway for RejectingGateway {
        async fn submit_block(&self, _submission: &BlockSubmission) -> Result<SubmissionReceipt> {
            self.release.notified().await;
            if self.success {
                Ok(SubmissionReceipt::accepted(false))
            } else {
                Err(StudyError::io("connection reset"))
            }
        }

        async fn load_responses(&self, _session_id: &str) -> Result<Vec<BlockSubmission>> {
            Ok(Vec::new())
        }
    }

    fn submission() -> BlockSubmission {
        BlockSubmission {
            session_id: "s".to_string(),
            block_id: "q".to_string(),
            block_type: BlockType::YesNo,
            response: Payload::new(),
            is_last_block: false,
            metadata: SubmissionMetadata {
                study_id: "study".to_string(),
                block_index: 0,
                time_spent_seconds: 0,
                total_pause_duration_ms: 0,
            },
            start_time: Utc::now(),
            interaction_count: 0,
            analytics: Vec::new(),
        }
    }

    fn gateway(
        submissions: Arc<dyn SubmissionGateway>,
        store: Arc<CountingStore>,
    ) -> Arc<PersistenceGateway> {
        Arc::new(PersistenceGateway::new(
            submissions,
            store,
            Arc::new(SystemClock),
        ))
    }

    #[tokio::test]
    async fn test_block_save_errors_become_persistence_errors() {
        let release = Arc::new(Notify::new());
        release.notify_one();
        let gw = gateway(
            Arc::new(RejectingGateway {
                success: false,
                release,
            }),
            Arc::new(CountingStore::default()),
        );

        let err = gw.save_block(&submission()).await.unwrap_err();
        assert!(err.is_persistence());
    }

    #[tokio::test]
    async fn test_concurrent_block_save_is_rejected() {
        let release = Arc::new(Notify::new());
        let gw = gateway(
            Arc::new(RejectingGateway {
                success: true,
                release: release.clone(),
            }),
            Arc::new(CountingStore::default()),
        );

        let first = {
            let gw = gw.clone();
            tokio::spawn(async move { gw.save_block(&submission()).await })
        };
        tokio::task::yield_now().await;

        let second = gw.save_block(&submission()).await.unwrap_err();
        assert!(second.is_save_in_flight());

        release.notify_one();
        assert!(first.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_tick_skipped_while_progress_save_in_flight() {
        let release = Arc::new(Notify::new());
        let store = Arc::new(CountingStore {
            saves: AtomicUsize::new(0),
            release: Some(release.clone()),
        });
        let gw = gateway(
            Arc::new(RejectingGateway {
                success: true,
                release: Arc::new(Notify::new()),
            }),
            store.clone(),
        );
        let state = SessionState::new("s", "study");

        let pending = {
            let gw = gw.clone();
            let state = state.clone();
            tokio::spawn(async move { gw.save_progress(&state).await })
        };
        tokio::task::yield_now().await;

        assert_eq!(gw.autosave_tick(&state).await, ProgressSave::Skipped);
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);

        release.notify_one();
        assert!(matches!(pending.await.unwrap(), ProgressSave::Saved(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_ticks_until_stopped() {
        let store = Arc::new(CountingStore::default());
        let gw = gateway(
            Arc::new(RejectingGateway {
                success: true,
                release: Arc::new(Notify::new()),
            }),
            store.clone(),
        );
        let (_tx, rx) = watch::channel(SessionState::new("s", "study"));

        let handle = gw.start_autosave(rx, Duration::from_secs(30));
        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(store.saves.load(Ordering::SeqCst), 3);

        handle.stop().await;
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(store.saves.load(Ordering::SeqCst), 3);
    }
}
