//! Analytics module.
//!
//! - `event`: `AnalyticsEvent`, `EventKind`
//! - `scratch`: transient per-block start time and interaction counter
//! - `recorder`: `AnalyticsRecorder`, which sequences events per block

mod event;
mod recorder;
mod scratch;

pub use event::{AnalyticsEvent, EventKind};
pub use recorder::{AnalyticsRecorder, BlockCompletion};
pub use scratch::{BlockScratch, ScratchScope};
