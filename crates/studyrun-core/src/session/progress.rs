use super::model::SessionState;
use serde::{Deserialize, Serialize};

/// How far a session has come through its sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    pub total: usize,
    pub completed: usize,
    pub remaining: usize,
    /// 0.0 to 100.0, based on position rather than answered blocks.
    pub percent: f64,
    pub is_complete: bool,
}

impl SessionProgress {
    pub fn of(state: &SessionState, total: usize) -> Self {
        let position = state.current_block_index.min(total);
        let percent = if state.is_completed() || total == 0 {
            100.0
        } else {
            position as f64 * 100.0 / total as f64
        };
        Self {
            total,
            completed: state.completed_block_ids.len(),
            remaining: total - position,
            percent,
            is_complete: state.is_completed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_midway() {
        let mut state = SessionState::new("s", "study");
        state.record_advance("a", 1);
        let progress = SessionProgress::of(&state, 4);
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.remaining, 3);
        assert_eq!(progress.percent, 25.0);
        assert!(!progress.is_complete);
    }

    #[test]
    fn test_progress_skipped_blocks_count_as_passed() {
        let mut state = SessionState::new("s", "study");
        state.record_advance("branch", 3);
        state.complete();
        let progress = SessionProgress::of(&state, 4);
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.remaining, 1);
        assert_eq!(progress.percent, 100.0);
        assert!(progress.is_complete);
    }
}
