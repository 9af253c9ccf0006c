//! Persistence boundary.
//!
//! - `model`: submission, receipt and progress snapshot payloads
//! - `repository`: `SubmissionGateway` and `ProgressStore` traits

mod model;
mod repository;

pub use model::{
    BlockSubmission, ProgressSnapshot, ReceiptData, SubmissionMetadata, SubmissionReceipt,
};
pub use repository::{ProgressStore, SubmissionGateway};
