pub mod analytics;
pub mod block;
pub mod branch;
pub mod capability;
pub mod clock;
pub mod config;
pub mod error;
pub mod followup;
pub mod persistence;
pub mod response;
pub mod session;
pub mod validation;

// Re-export common error type
pub use error::StudyError;
