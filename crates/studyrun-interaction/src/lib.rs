//! Network collaborators for studyrun.
//!
//! - [`HttpStudyBackend`]: blocks, per-block submissions and progress over JSON/HTTP
//! - [`FollowUpAgent`]: follow-up question generation through a messages API

pub mod followup_agent;
pub mod http_backend;

pub use followup_agent::FollowUpAgent;
pub use http_backend::HttpStudyBackend;
