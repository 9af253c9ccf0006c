//! Session State Machine.
//!
//! `SessionEngine` owns the only mutable `SessionState` of a participant run
//! and drives it through `active -> paused -> active -> completed`.
//!
//! - `advance`: validation, per-block save, branching, completion
//! - `lifecycle`: pause, resume, exit, completion teardown
//! - `prompt`: follow-up questions for `ai_followup` blocks
//!
//! Collaborators arrive through [`SessionContext`]; the engine holds no
//! global state.

mod advance;
mod lifecycle;
mod prompt;


use crate::followup::FollowUpService;
use crate::gateway::{AutosaveHandle, PersistenceGateway, ProgressSave};
use serde::Serialize;
use std::sync::Arc;
use studyrun_core::analytics::{AnalyticsEvent, AnalyticsRecorder};
use studyrun_core::block::{Block, BlockSequence, BlockSource};
use studyrun_core::clock::{Clock, SystemClock};
use studyrun_core::config::{EngineConfig, ValidationPolicy};
use studyrun_core::error::{Result, StudyError};
use studyrun_core::followup::FollowUpGenerator;
use studyrun_core::persistence::{BlockSubmission, ProgressStore, SubmissionGateway};
use studyrun_core::response::{Response, ResponseSet};
use studyrun_core::session::{SessionProgress, SessionState};
use studyrun_core::validation::ValidationFinding;
use tokio::sync::{Mutex, watch};

/// Everything a session needs from the outside world.
#[derive(Clone)]
pub struct SessionContext {
    pub blocks: Arc<dyn BlockSource>,
    pub submissions: Arc<dyn SubmissionGateway>,
    pub progress: Arc<dyn ProgressStore>,
    pub followups: Option<Arc<dyn FollowUpGenerator>>,
    pub clock: Arc<dyn Clock>,
    pub config: EngineConfig,
}

impl SessionContext {
    pub fn new(
        blocks: Arc<dyn BlockSource>,
        submissions: Arc<dyn SubmissionGateway>,
        progress: Arc<dyn ProgressStore>,
    ) -> Self {
        Self {
            blocks,
            submissions,
            progress,
            followups: None,
            clock: Arc::new(SystemClock),
            config: EngineConfig::default(),
        }
    }

    pub fn with_followups(mut self, generator: Arc<dyn FollowUpGenerator>) -> Self {
        self.followups = Some(generator);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }
}

/// What `advance()` did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    /// Validation found errors; nothing was saved and the index is unchanged.
    Rejected { findings: Vec<ValidationFinding> },
    Advanced {
        block_id: String,
        from_index: usize,
        to_index: usize,
        /// Warning-level findings; informational only.
        warnings: Vec<ValidationFinding>,
        completed: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        completion_message: Option<String>,
    },
}

impl AdvanceOutcome {
    pub fn is_advanced(&self) -> bool {
        matches!(self, AdvanceOutcome::Advanced { .. })
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, AdvanceOutcome::Advanced { completed: true, .. })
    }
}

pub(crate) struct EngineState {
    pub(crate) session: SessionState,
    pub(crate) responses: ResponseSet,
    pub(crate) recorder: AnalyticsRecorder,
    pub(crate) exited: bool,
}

pub struct SessionEngine {
    sequence: BlockSequence,
    gateway: Arc<PersistenceGateway>,
    followups: FollowUpService,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    policy: ValidationPolicy,
    inner: Mutex<EngineState>,
    advancing: Mutex<()>,
    state_tx: watch::Sender<SessionState>,
    autosave: Mutex<Option<AutosaveHandle>>,
}

impl SessionEngine {
    /// Loads the study and opens a new session at its first block.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Load` if the blocks cannot be fetched or do not
    /// form a valid sequence. No partial session is created.
    pub async fn start(
        context: SessionContext,
        study_id: &str,
        session_id: impl Into<String>,
    ) -> Result<Self> {
        let session_id = session_id.into();
        let sequence = load_sequence(context.blocks.as_ref(), study_id).await?;

        let session = SessionState::new(&session_id, study_id);
        let engine = Self::assemble(context, sequence, session, ResponseSet::new());
        tracing::info!(
            "[SessionEngine] Started session {} for study {} ({} blocks)",
            session_id,
            study_id,
            engine.sequence.len()
        );

        engine.open_current_block().await;
        engine.persist_progress().await;
        engine.start_autosave().await;
        Ok(engine)
    }

    /// Rebuilds an interrupted session from its last progress snapshot.
    ///
    /// Pause accounting carries over; a session saved while paused comes
    /// back paused. Answers to completed blocks are read back from the
    /// submission store. The current block is started afresh.
    ///
    /// # Errors
    ///
    /// - `StudyError::NotFound` if nothing was saved for `session_id`
    /// - `StudyError::Load` if the snapshot, the blocks or the saved answers cannot be read, or
    ///   the snapshot does not fit the freshly loaded sequence
    /// - `StudyError::InvalidState` if the session already completed
    pub async fn resume_from_store(
        context: SessionContext,
        study_id: &str,
        session_id: &str,
    ) -> Result<Self> {
        let snapshot = context
            .progress
            .load_progress(session_id)
            .await
            .map_err(|e| match e {
                StudyError::Load(_) => e,
                other => StudyError::load(other.to_string()),
            })?
            .ok_or_else(|| StudyError::not_found("Session", session_id))?;

        let session = snapshot.session_state;
        if session.study_id != study_id {
            return Err(StudyError::load(format!(
                "session {} belongs to study '{}', not '{}'",
                session_id, session.study_id, study_id
            )));
        }
        if session.is_completed() {
            return Err(StudyError::invalid_state(format!(
                "session {} is already completed",
                session_id
            )));
        }

        let sequence = load_sequence(context.blocks.as_ref(), study_id).await?;
        session
            .check_invariants(&sequence)
            .map_err(|e| StudyError::load(format!("stored progress does not fit study: {}", e)))?;

        let submissions = context
            .submissions
            .load_responses(session_id)
            .await
            .map_err(|e| match e {
                StudyError::Load(_) => e,
                other => StudyError::load(other.to_string()),
            })?;
        let responses = restore_responses(&session, submissions);
        let restored = responses.len();

        let engine = Self::assemble(context, sequence, session, responses);
        tracing::info!(
            "[SessionEngine] Resumed session {} at block index {} ({} saved answers)",
            session_id,
            snapshot.current_block_index,
            restored
        );

        engine.open_current_block().await;
        engine.start_autosave().await;
        Ok(engine)
    }

    fn assemble(
        context: SessionContext,
        sequence: BlockSequence,
        session: SessionState,
        responses: ResponseSet,
    ) -> Self {
        let gateway = Arc::new(PersistenceGateway::new(
            context.submissions,
            context.progress,
            context.clock.clone(),
        ));
        let followups = FollowUpService::from_config(context.followups, &context.config);
        let (state_tx, _) = watch::channel(session.clone());

        Self {
            sequence,
            gateway,
            followups,
            policy: context.config.validation_policy(),
            config: context.config,
            inner: Mutex::new(EngineState {
                session,
                responses,
                recorder: AnalyticsRecorder::new(context.clock.clone()),
                exited: false,
            }),
            clock: context.clock,
            advancing: Mutex::new(()),
            state_tx,
            autosave: Mutex::new(None),
        }
    }

    async fn open_current_block(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(block) = self.sequence.get(inner.session.current_block_index) {
            let event = inner.recorder.start_block(&block.id);
            tracing::debug!(
                "[SessionEngine] Block {} started (sequence {})",
                block.id,
                event.sequence
            );
        }
    }

    async fn start_autosave(&self) {
        let handle = self
            .gateway
            .start_autosave(self.state_tx.subscribe(), self.config.autosave_interval());
        *self.autosave.lock().await = Some(handle);
    }

    /// Publishes the current state to the auto-save task.
    pub(crate) fn publish(&self, session: &SessionState) {
        self.state_tx.send_replace(session.clone());
    }

    /// Saves progress for a transition and stamps `last_save_timestamp` on success.
    pub(crate) async fn persist_progress(&self) {
        let snapshot = {
            let inner = self.inner.lock().await;
            if inner.exited {
                return;
            }
            inner.session.clone()
        };

        if let ProgressSave::Saved(at) = self.gateway.save_progress(&snapshot).await {
            let mut inner = self.inner.lock().await;
            inner.session.last_save_timestamp = Some(at);
            self.publish(&inner.session);
        }
    }

    pub fn sequence(&self) -> &BlockSequence {
        &self.sequence
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.session.clone()
    }

    /// `None` once the session is past its last block.
    pub async fn current_block(&self) -> Option<Block> {
        let index = self.inner.lock().await.session.current_block_index;
        self.sequence.get(index).cloned()
    }

    pub async fn progress(&self) -> SessionProgress {
        SessionProgress::of(&self.inner.lock().await.session, self.sequence.len())
    }

    pub async fn responses(&self) -> ResponseSet {
        self.inner.lock().await.responses.clone()
    }

    /// Events recorded so far for the block's current visit.
    pub async fn events(&self, block_id: &str) -> Vec<AnalyticsEvent> {
        self.inner.lock().await.recorder.events(block_id).to_vec()
    }

    /// Follows every state change the engine publishes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub async fn is_autosave_running(&self) -> bool {
        self.autosave
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_stopped())
    }
}

async fn load_sequence(source: &dyn BlockSource, study_id: &str) -> Result<BlockSequence> {
    let blocks = source.fetch_blocks(study_id).await.map_err(|e| match e {
        StudyError::Load(_) => e,
        other => StudyError::load(format!("failed to fetch study '{}': {}", study_id, other)),
    })?;
    BlockSequence::new(blocks)
}

/// Answers of the blocks the session already completed, in submission order.
///
/// Submissions for blocks outside `completed_block_ids` (a save that was
/// accepted but never applied locally) are left out.
fn restore_responses(session: &SessionState, submissions: Vec<BlockSubmission>) -> ResponseSet {
    submissions
        .into_iter()
        .filter(|s| session.completed_block_ids.contains(&s.block_id))
        .map(|s| Response {
            created_at: s.start_time
                + chrono::Duration::seconds(s.metadata.time_spent_seconds as i64),
            block_id: s.block_id,
            block_type: s.block_type,
            payload: s.response,
            time_spent_seconds: s.metadata.time_spent_seconds,
            interaction_count: s.interaction_count,
        })
        .collect()
}
