//! Pause, resume, exit and completion teardown.

use super::SessionEngine;
use serde_json::json;
use studyrun_core::analytics::EventKind;
use studyrun_core::error::{Result, StudyError};

impl SessionEngine {
    /// `active -> paused`. A per-block save already in flight still applies
    /// its advance when it settles.
    pub async fn pause(&self) -> Result<()> {
        {
            let mut inner = self.inner.lock().await;
            if inner.exited {
                return Err(StudyError::invalid_state("session has exited"));
            }
            let now = self.clock.now();
            inner.session.pause(now)?;

            if let Some(block) = self.sequence.get(inner.session.current_block_index) {
                inner.recorder.record(
                    &block.id,
                    EventKind::SessionPause,
                    json!({ "pausedAt": now }),
                );
            }
            self.publish(&inner.session);
            tracing::info!("[SessionEngine] Session {} paused", inner.session.session_id);
        }

        self.persist_progress().await;
        Ok(())
    }

    /// `paused -> active`. Returns the length of the pause in milliseconds.
    pub async fn resume(&self) -> Result<u64> {
        let paused_ms = {
            let mut inner = self.inner.lock().await;
            if inner.exited {
                return Err(StudyError::invalid_state("session has exited"));
            }
            let paused_ms = inner.session.resume(self.clock.now())?;

            if let Some(block) = self.sequence.get(inner.session.current_block_index) {
                inner.recorder.record(
                    &block.id,
                    EventKind::SessionResume,
                    json!({ "pausedMs": paused_ms }),
                );
            }
            self.publish(&inner.session);
            tracing::info!(
                "[SessionEngine] Session {} resumed after {}ms (total {}ms)",
                inner.session.session_id,
                paused_ms,
                inner.session.total_pause_duration_ms
            );
            paused_ms
        };

        self.persist_progress().await;
        Ok(paused_ms)
    }

    /// Tears the session down: stops the auto-save timer, cancels a pending
    /// auto-save and drops transient per-block state.
    ///
    /// A per-block save already in flight is not cancelled.
    pub async fn exit(&self) {
        {
            let mut inner = self.inner.lock().await;
            if inner.exited {
                return;
            }
            inner.exited = true;
            inner.recorder.clear();
        }
        self.stop_autosave().await;
        tracing::info!("[SessionEngine] Session exited");
    }

    /// Completion teardown: stop the timer, write the final progress
    /// snapshot, archive it.
    pub(crate) async fn finish(&self) {
        self.stop_autosave().await;
        self.persist_progress().await;

        let (session_id, exited) = {
            let inner = self.inner.lock().await;
            (inner.session.session_id.clone(), inner.exited)
        };
        if exited {
            return;
        }

        if let Err(e) = self.gateway.progress_store().archive(&session_id).await {
            tracing::warn!(
                "[SessionEngine] Failed to archive completed session {}: {}",
                session_id,
                e
            );
        }
        tracing::info!("[SessionEngine] Session {} completed", session_id);
    }

    async fn stop_autosave(&self) {
        let handle = self.autosave.lock().await.take();
        if let Some(handle) = handle {
            handle.stop().await;
        }
    }
}
