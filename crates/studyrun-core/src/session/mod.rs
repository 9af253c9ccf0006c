//! Session module.
//!
//! - `model`: `SessionState`, `SessionStatus` and the state invariants
//! - `progress`: `SessionProgress` reporting

mod model;
mod progress;

pub use model::{SessionState, SessionStatus};
pub use progress::SessionProgress;
