pub mod completion;
pub mod engine;
pub mod followup;
pub mod gateway;

pub use completion::{CompletionDetector, CompletionVerdict};
pub use engine::{AdvanceOutcome, SessionContext, SessionEngine};
pub use followup::FollowUpService;
pub use gateway::{AutosaveHandle, PersistenceGateway, ProgressSave};
