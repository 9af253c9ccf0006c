//! Completion Detector.
//!
//! The store's `studyCompleted` flag wins over anything the client can work
//! out from its own index. Local arithmetic is only consulted when the store
//! stays silent.

use studyrun_core::persistence::SubmissionReceipt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionVerdict {
    Completed { message: Option<String> },
    Continue,
}

impl CompletionVerdict {
    pub fn is_completed(&self) -> bool {
        matches!(self, CompletionVerdict::Completed { .. })
    }
}

pub struct CompletionDetector;

impl CompletionDetector {
    /// Decides completion after a successful per-block save.
    ///
    /// * `Some(true)` completes wherever the session is.
    /// * `Some(false)` never completes, even past the last block.
    /// * `None` completes only when `next_index` reached the end.
    pub fn evaluate(
        receipt: &SubmissionReceipt,
        next_index: usize,
        sequence_len: usize,
    ) -> CompletionVerdict {
        let completed = match receipt.study_completed() {
            Some(flag) => flag,
            None => next_index >= sequence_len,
        };

        if completed {
            CompletionVerdict::Completed {
                message: receipt.data.completion_message.clone(),
            }
        } else {
            CompletionVerdict::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyrun_core::persistence::ReceiptData;

    fn silent() -> SubmissionReceipt {
        SubmissionReceipt {
            success: true,
            data: ReceiptData::default(),
        }
    }

    #[test]
    fn test_explicit_true_wins_mid_sequence() {
        let receipt = SubmissionReceipt::accepted(true).with_message("done");
        assert_eq!(
            CompletionDetector::evaluate(&receipt, 1, 5),
            CompletionVerdict::Completed {
                message: Some("done".to_string())
            }
        );
    }

    #[test]
    fn test_explicit_false_wins_at_end() {
        let receipt = SubmissionReceipt::accepted(false);
        assert_eq!(
            CompletionDetector::evaluate(&receipt, 3, 3),
            CompletionVerdict::Continue
        );
    }

    #[test]
    fn test_silent_store_falls_back_to_index() {
        assert!(!CompletionDetector::evaluate(&silent(), 2, 3).is_completed());
        assert!(CompletionDetector::evaluate(&silent(), 3, 3).is_completed());
    }
}
