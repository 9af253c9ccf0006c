//! Analytics Recorder.

use super::event::{AnalyticsEvent, EventKind};
use super::scratch::ScratchScope;
use crate::clock::Clock;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

/// Everything the per-block save needs from the recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockCompletion {
    pub block_id: String,
    pub started_at: DateTime<Utc>,
    pub time_spent_seconds: u64,
    pub interaction_count: u32,
    /// The block's event log, ending with `block_complete`.
    pub events: Vec<AnalyticsEvent>,
}

#[derive(Debug, Default)]
struct BlockLog {
    events: Vec<AnalyticsEvent>,
    next_sequence: u32,
}

/// Appends ordered, per-block sequenced events.
///
/// Sequence counters live for the whole session, so a block visited twice
/// keeps counting up instead of reusing numbers.
pub struct AnalyticsRecorder {
    clock: Arc<dyn Clock>,
    scratch: ScratchScope,
    logs: HashMap<String, BlockLog>,
    pending: HashMap<String, BlockCompletion>,
}

impl AnalyticsRecorder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            scratch: ScratchScope::new(),
            logs: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    fn append(&mut self, block_id: &str, kind: EventKind, data: Value) -> AnalyticsEvent {
        let log = self.logs.entry(block_id.to_string()).or_default();
        let event = AnalyticsEvent {
            kind,
            block_id: block_id.to_string(),
            timestamp: self.clock.now(),
            data,
            sequence: log.next_sequence,
        };
        log.next_sequence += 1;
        log.events.push(event.clone());
        event
    }

    /// Marks a block as current: opens its scratch entry and emits `block_start`.
    pub fn start_block(&mut self, block_id: &str) -> AnalyticsEvent {
        let now = self.clock.now();
        self.scratch.open(block_id, now);
        self.pending.remove(block_id);
        if let Some(log) = self.logs.get_mut(block_id) {
            log.events.clear();
        }
        self.append(block_id, EventKind::BlockStart, Value::Null)
    }

    /// Counts one UI interaction on a started block.
    ///
    /// Returns `None` if the block has not been started.
    pub fn record_interaction(&mut self, block_id: &str, data: Value) -> Option<AnalyticsEvent> {
        let scratch = self.scratch.get_mut(block_id)?;
        scratch.interaction_count += 1;
        Some(self.record(block_id, EventKind::Interaction, data))
    }

    /// Appends an arbitrary event to a block's log.
    ///
    /// Any cached completion for the block is discarded, so the next
    /// [`prepare_completion`](Self::prepare_completion) reflects the new event.
    pub fn record(&mut self, block_id: &str, kind: EventKind, data: Value) -> AnalyticsEvent {
        self.pending.remove(block_id);
        self.append(block_id, kind, data)
    }

    /// Builds `block_complete` and returns the data for the per-block save.
    ///
    /// The completion event is not part of the log until [`commit`](Self::commit);
    /// it takes the next free sequence number without consuming it. Calling
    /// this again without new events in between returns the same completion,
    /// so a retried save carries an identical payload.
    pub fn prepare_completion(&mut self, block_id: &str) -> BlockCompletion {
        if let Some(pending) = self.pending.get(block_id) {
            return pending.clone();
        }

        let now = self.clock.now();
        let (started_at, interaction_count) = match self.scratch.get(block_id) {
            Some(scratch) => (scratch.started_at, scratch.interaction_count),
            None => (now, 0),
        };
        let time_spent_seconds = (now - started_at).num_seconds().max(0) as u64;

        let log = self.logs.entry(block_id.to_string()).or_default();
        let mut events = log.events.clone();
        events.push(AnalyticsEvent {
            kind: EventKind::BlockComplete,
            block_id: block_id.to_string(),
            timestamp: now,
            data: json!({
                "timeSpentSeconds": time_spent_seconds,
                "interactionCount": interaction_count,
            }),
            sequence: log.next_sequence,
        });

        let completion = BlockCompletion {
            block_id: block_id.to_string(),
            started_at,
            time_spent_seconds,
            interaction_count,
            events,
        };
        self.pending.insert(block_id.to_string(), completion.clone());
        completion
    }

    /// Called once `completion` is recorded: consumes its sequence numbers
    /// and drops the block's transient state.
    pub fn commit(&mut self, completion: &BlockCompletion) {
        let block_id = completion.block_id.as_str();
        self.pending.remove(block_id);
        self.scratch.clear(block_id);
        let log = self.logs.entry(block_id.to_string()).or_default();
        if let Some(last) = completion.events.last() {
            log.next_sequence = log.next_sequence.max(last.sequence + 1);
        }
        log.events.clear();
    }

    /// Events recorded for the block's current visit.
    pub fn events(&self, block_id: &str) -> &[AnalyticsEvent] {
        self.logs
            .get(block_id)
            .map(|log| log.events.as_slice())
            .unwrap_or(&[])
    }

    pub fn interaction_count(&self, block_id: &str) -> u32 {
        self.scratch
            .get(block_id)
            .map(|s| s.interaction_count)
            .unwrap_or(0)
    }

    /// Drops all transient state (session exit).
    pub fn clear(&mut self) {
        self.scratch.clear_all();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone};

    fn recorder() -> (AnalyticsRecorder, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
        (AnalyticsRecorder::new(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_sequences_start_at_zero_without_gaps() {
        let (mut rec, clock) = recorder();
        assert_eq!(rec.start_block("a").sequence, 0);
        rec.record_interaction("a", json!({"kind": "click"}));
        rec.record_interaction("a", json!({"kind": "type"}));
        clock.advance(Duration::seconds(12));
        let completion = rec.prepare_completion("a");

        let sequences: Vec<u32> = completion.events.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3]);
        assert_eq!(completion.events.last().unwrap().kind, EventKind::BlockComplete);
        assert_eq!(completion.time_spent_seconds, 12);
        assert_eq!(completion.interaction_count, 2);
    }

    #[test]
    fn test_sequences_are_independent_per_block() {
        let (mut rec, _) = recorder();
        rec.start_block("a");
        rec.record_interaction("a", Value::Null);
        assert_eq!(rec.start_block("b").sequence, 0);
    }

    #[test]
    fn test_prepare_completion_is_stable_until_new_events() {
        let (mut rec, clock) = recorder();
        rec.start_block("a");
        let first = rec.prepare_completion("a");
        clock.advance(Duration::seconds(30));
        let again = rec.prepare_completion("a");
        assert_eq!(first, again);
        assert_eq!(rec.events("a").len(), 1);

        rec.record_interaction("a", Value::Null);
        let third = rec.prepare_completion("a");
        let kinds: Vec<EventKind> = third.events.iter().map(|e| e.kind).collect();
        let sequences: Vec<u32> = third.events.iter().map(|e| e.sequence).collect();
        assert_eq!(
            kinds,
            vec![EventKind::BlockStart, EventKind::Interaction, EventKind::BlockComplete]
        );
        assert_eq!(sequences, vec![0, 1, 2]);
        assert_eq!(third.time_spent_seconds, 30);
    }

    #[test]
    fn test_commit_clears_scratch_but_never_reuses_sequences() {
        let (mut rec, _) = recorder();
        rec.start_block("a");
        let completion = rec.prepare_completion("a");
        rec.commit(&completion);
        assert!(rec.events("a").is_empty());
        assert_eq!(rec.interaction_count("a"), 0);
        assert!(rec.record_interaction("a", Value::Null).is_none());

        // revisiting the block continues the counter
        assert_eq!(rec.start_block("a").sequence, 2);
    }

    #[test]
    fn test_commit_skips_numbers_taken_by_events_after_prepare() {
        let (mut rec, _) = recorder();
        rec.start_block("a");
        let completion = rec.prepare_completion("a");
        // e.g. a pause while the save is in flight
        rec.record("a", EventKind::SessionPause, Value::Null);
        rec.commit(&completion);

        assert_eq!(rec.start_block("a").sequence, 2);
    }
}
