use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_MIN_OPEN_TEXT_LENGTH: usize = 10;
pub const DEFAULT_FOLLOWUP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_FOLLOWUP_FALLBACK_PROMPT: &str =
    "Could you tell us a bit more about your previous answer?";

/// Engine-wide settings, loaded from `config.toml`.
///
/// Every field has a default so a partial (or empty) file is valid.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Interval of the progress auto-save timer.
    pub autosave_interval_secs: u64,
    /// Below this many characters an open-text answer gets a warning.
    pub min_open_text_length: usize,
    pub followup_timeout_secs: u64,
    /// Shown when the follow-up generator fails or times out.
    pub followup_fallback_prompt: String,
    pub followup_max_questions: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            autosave_interval_secs: DEFAULT_AUTOSAVE_INTERVAL_SECS,
            min_open_text_length: DEFAULT_MIN_OPEN_TEXT_LENGTH,
            followup_timeout_secs: DEFAULT_FOLLOWUP_TIMEOUT_SECS,
            followup_fallback_prompt: DEFAULT_FOLLOWUP_FALLBACK_PROMPT.to_string(),
            followup_max_questions: 1,
        }
    }
}

impl EngineConfig {
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs.max(1))
    }

    pub fn followup_timeout(&self) -> Duration {
        Duration::from_secs(self.followup_timeout_secs)
    }

    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            min_open_text_length: self.min_open_text_length,
        }
    }
}

/// The slice of configuration the response validator reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub min_open_text_length: usize,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            min_open_text_length: DEFAULT_MIN_OPEN_TEXT_LENGTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str("autosave_interval_secs = 5").unwrap();
        assert_eq!(config.autosave_interval_secs, 5);
        assert_eq!(config.min_open_text_length, DEFAULT_MIN_OPEN_TEXT_LENGTH);
        assert_eq!(config.followup_fallback_prompt, DEFAULT_FOLLOWUP_FALLBACK_PROMPT);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = EngineConfig {
            autosave_interval_secs: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.autosave_interval(), Duration::from_secs(1));
    }
}
