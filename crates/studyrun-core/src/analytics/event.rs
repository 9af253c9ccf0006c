use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    BlockStart,
    Interaction,
    ValidationFailed,
    SessionPause,
    SessionResume,
    BlockComplete,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::BlockStart => "block_start",
            EventKind::Interaction => "interaction",
            EventKind::ValidationFailed => "validation_failed",
            EventKind::SessionPause => "session_pause",
            EventKind::SessionResume => "session_resume",
            EventKind::BlockComplete => "block_complete",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only analytics record, sequenced per block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub block_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data: Value,
    pub sequence: u32,
}
