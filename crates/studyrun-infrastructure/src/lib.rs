pub mod config_service;
pub mod file_block_source;
pub mod file_progress_store;
pub mod file_submission_store;
pub mod memory_store;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::file_block_source::FileBlockSource;
pub use crate::file_progress_store::FileProgressStore;
pub use crate::file_submission_store::FileSubmissionStore;
pub use crate::memory_store::MemoryStore;
