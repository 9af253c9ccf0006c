//! `advance()`: the single way past a block.
//!
//! 1. validate the payload (errors end here, nothing is saved)
//! 2. resolve the next index (branch blocks consult the resolver)
//! 3. per-block save; the state lock is released while it is in flight
//! 4. apply the advance and ask the completion detector
//!
//! A failed save leaves the session exactly where it was. The prepared
//! analytics completion is kept, so a retry sends the same payload.

use super::{AdvanceOutcome, EngineState, SessionEngine};
use crate::completion::{CompletionDetector, CompletionVerdict};
use serde_json::{Value, json};
use studyrun_core::analytics::{AnalyticsEvent, BlockCompletion, EventKind};
use studyrun_core::block::Block;
use studyrun_core::capability::capability_for;
use studyrun_core::error::{Result, StudyError};
use studyrun_core::persistence::{BlockSubmission, SubmissionMetadata, SubmissionReceipt};
use studyrun_core::response::{Payload, Response, ResponseSet};
use studyrun_core::validation::{ValidationFinding, has_errors, validate};

struct PendingAdvance {
    block: Block,
    from_index: usize,
    next_index: usize,
    payload: Payload,
    warnings: Vec<ValidationFinding>,
    completion: BlockCompletion,
    submission: BlockSubmission,
}

enum Step {
    Rejected(Vec<ValidationFinding>),
    Submit(Box<PendingAdvance>),
}

impl SessionEngine {
    /// Submits the participant's answer for the current block and moves on.
    ///
    /// Conditional-branch blocks take an empty payload.
    ///
    /// # Errors
    ///
    /// - `StudyError::SaveInFlight` while a previous `advance()` is still saving
    /// - `StudyError::InvalidState` if the session is paused, completed,
    ///   exited, or has no current block
    /// - `StudyError::BranchConfiguration` if a branch block cannot resolve a
    ///   forward target
    /// - `StudyError::Persistence` if the per-block save fails
    pub async fn advance(&self, payload: Payload) -> Result<AdvanceOutcome> {
        let _advancing = self.advancing.try_lock().map_err(|_| {
            tracing::warn!("[SessionEngine] advance() rejected, previous save still in flight");
            StudyError::SaveInFlight
        })?;

        let step = {
            let mut inner = self.inner.lock().await;
            self.prepare(&mut inner, payload)?
        };
        let pending = match step {
            Step::Rejected(findings) => return Ok(AdvanceOutcome::Rejected { findings }),
            Step::Submit(pending) => *pending,
        };

        let receipt = match self.gateway.save_block(&pending.submission).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::error!(
                    "[SessionEngine] Save failed for block {}, staying at index {}: {}",
                    pending.block.id,
                    pending.from_index,
                    e
                );
                return Err(e);
            }
        };

        let outcome = {
            let mut inner = self.inner.lock().await;
            self.apply(&mut inner, pending, &receipt)
        };

        if outcome.is_completed() {
            self.finish().await;
        } else {
            self.persist_progress().await;
        }
        Ok(outcome)
    }

    fn prepare(&self, inner: &mut EngineState, payload: Payload) -> Result<Step> {
        if inner.exited {
            return Err(StudyError::invalid_state("session has exited"));
        }
        if !inner.session.is_active() {
            return Err(StudyError::invalid_state(format!(
                "cannot advance a {} session",
                inner.session.status
            )));
        }

        let from_index = inner.session.current_block_index;
        let block = self.sequence.get(from_index).cloned().ok_or_else(|| {
            StudyError::invalid_state(format!("no block at index {}", from_index))
        })?;

        let findings = validate(&block, &payload, &self.policy);
        if has_errors(&findings) {
            tracing::debug!(
                "[SessionEngine] Block {} rejected with {} finding(s)",
                block.id,
                findings.len()
            );
            inner.recorder.record(
                &block.id,
                EventKind::ValidationFailed,
                json!({ "findings": findings }),
            );
            return Ok(Step::Rejected(findings));
        }

        let next_index = self.next_index(&block, from_index, &inner.responses)?;
        let completion = inner.recorder.prepare_completion(&block.id);

        let submission = BlockSubmission {
            session_id: inner.session.session_id.clone(),
            block_id: block.id.clone(),
            block_type: block.block_type,
            response: payload.clone(),
            is_last_block: self.sequence.is_last(from_index),
            metadata: SubmissionMetadata {
                study_id: inner.session.study_id.clone(),
                block_index: from_index,
                time_spent_seconds: completion.time_spent_seconds,
                total_pause_duration_ms: inner.session.total_pause_duration_ms,
            },
            start_time: completion.started_at,
            interaction_count: completion.interaction_count,
            analytics: completion.events.clone(),
        };

        Ok(Step::Submit(Box::new(PendingAdvance {
            block,
            from_index,
            next_index,
            payload,
            warnings: findings,
            completion,
            submission,
        })))
    }

    /// Sequential blocks move to `index + 1`; branch blocks jump forward to
    /// the resolver's target.
    fn next_index(&self, block: &Block, index: usize, responses: &ResponseSet) -> Result<usize> {
        let Some(resolved) = capability_for(block.block_type).resolve_next(block, responses) else {
            return Ok(index + 1);
        };
        let target = resolved?;

        match self.sequence.index_of(&target) {
            Some(next) if next > index => Ok(next),
            Some(_) => Err(StudyError::branch_configuration(
                &block.id,
                format!("target '{}' is not after the branch", target),
            )),
            None => Err(StudyError::branch_configuration(
                &block.id,
                format!("target '{}' is not a block of this study", target),
            )),
        }
    }

    fn apply(
        &self,
        inner: &mut EngineState,
        pending: PendingAdvance,
        receipt: &SubmissionReceipt,
    ) -> AdvanceOutcome {
        let PendingAdvance {
            block,
            from_index,
            next_index,
            payload,
            warnings,
            completion,
            ..
        } = pending;

        inner.responses.push(Response {
            block_id: block.id.clone(),
            block_type: block.block_type,
            payload,
            time_spent_seconds: completion.time_spent_seconds,
            interaction_count: completion.interaction_count,
            created_at: self.clock.now(),
        });
        inner.recorder.commit(&completion);
        inner.session.record_advance(&block.id, next_index);

        let verdict = CompletionDetector::evaluate(receipt, next_index, self.sequence.len());
        let completion_message = match &verdict {
            CompletionVerdict::Completed { message } => {
                inner.session.complete();
                inner.recorder.clear();
                message.clone()
            }
            CompletionVerdict::Continue => {
                match self.sequence.get(next_index) {
                    // an exited session keeps no transient block state
                    Some(_) if inner.exited => {}
                    Some(next) => {
                        inner.recorder.start_block(&next.id);
                    }
                    None => tracing::info!(
                        "[SessionEngine] Session {} passed its last block without a completion signal",
                        inner.session.session_id
                    ),
                }
                None
            }
        };

        self.publish(&inner.session);
        tracing::info!(
            "[SessionEngine] Advanced {} -> {} past block {} (completed={})",
            from_index,
            next_index,
            block.id,
            verdict.is_completed()
        );

        AdvanceOutcome::Advanced {
            block_id: block.id,
            from_index,
            to_index: next_index,
            warnings,
            completed: verdict.is_completed(),
            completion_message,
        }
    }

    /// Counts a UI interaction on the current block.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::InvalidState` unless the session is active and
    /// has a current block.
    pub async fn record_interaction(&self, data: Value) -> Result<AnalyticsEvent> {
        let mut inner = self.inner.lock().await;
        if inner.exited || !inner.session.is_active() {
            return Err(StudyError::invalid_state(format!(
                "cannot record interactions on a {} session",
                inner.session.status
            )));
        }
        let index = inner.session.current_block_index;
        let block_id = self
            .sequence
            .get(index)
            .map(|block| block.id.clone())
            .ok_or_else(|| StudyError::invalid_state(format!("no block at index {}", index)))?;

        inner
            .recorder
            .record_interaction(&block_id, data)
            .ok_or_else(|| StudyError::internal(format!("block {} was never started", block_id)))
    }
}
