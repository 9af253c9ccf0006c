//! Configuration service implementation.
//!
//! Loads `EngineConfig` from `config.toml` (by default
//! `~/.config/studyrun/config.toml`) and applies environment overrides.

use crate::paths::{PathError, StudyrunPaths};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use studyrun_core::config::EngineConfig;
use studyrun_core::error::{Result, StudyError};

pub const ENV_AUTOSAVE_SECS: &str = "STUDYRUN_AUTOSAVE_SECS";
pub const ENV_MIN_TEXT_LENGTH: &str = "STUDYRUN_MIN_TEXT_LENGTH";

/// Configuration service that loads and caches the engine configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    config: Arc<RwLock<Option<EngineConfig>>>,
}

impl ConfigService {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Uses the platform config file location.
    pub fn default_location() -> std::result::Result<Self, PathError> {
        Ok(Self::new(StudyrunPaths::config_file()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the configuration, loading it on first access.
    ///
    /// A missing or unreadable file yields the defaults (with overrides still
    /// applied); the problem is logged rather than returned.
    pub fn get_config(&self) -> EngineConfig {
        {
            let read_lock = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = self.load().unwrap_or_else(|e| {
            tracing::warn!("[ConfigService] Falling back to defaults: {}", e);
            apply_env_overrides(EngineConfig::default(), |key| std::env::var(key).ok())
        });

        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = Some(loaded.clone());
        loaded
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = None;
    }

    /// Reads the file and applies process environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Config` if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<EngineConfig> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// Like [`load`](Self::load) with a custom environment lookup.
    pub fn load_with_env<F>(&self, lookup: F) -> Result<EngineConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_file = if self.path.exists() {
            let content = std::fs::read_to_string(&self.path).map_err(|e| {
                StudyError::config(format!("failed to read {}: {}", self.path.display(), e))
            })?;
            toml::from_str(&content).map_err(|e| {
                StudyError::config(format!("failed to parse {}: {}", self.path.display(), e))
            })?
        } else {
            tracing::debug!(
                "[ConfigService] {} not found, using defaults",
                self.path.display()
            );
            EngineConfig::default()
        };

        Ok(apply_env_overrides(from_file, lookup))
    }
}

/// Applies `STUDYRUN_*` overrides. Unparseable values are ignored with a warning.
pub fn apply_env_overrides<F>(mut config: EngineConfig, lookup: F) -> EngineConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(ENV_AUTOSAVE_SECS) {
        match raw.trim().parse() {
            Ok(secs) => config.autosave_interval_secs = secs,
            Err(_) => tracing::warn!("[ConfigService] Ignoring {}={}", ENV_AUTOSAVE_SECS, raw),
        }
    }
    if let Some(raw) = lookup(ENV_MIN_TEXT_LENGTH) {
        match raw.trim().parse() {
            Ok(len) => config.min_open_text_length = len,
            Err(_) => tracing::warn!("[ConfigService] Ignoring {}={}", ENV_MIN_TEXT_LENGTH, raw),
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let service = ConfigService::new(dir.path().join("config.toml"));
        assert_eq!(service.load_with_env(env(&[])).unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_file_then_env_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "autosave_interval_secs = 12\nmin_open_text_length = 4\n").unwrap();
        let service = ConfigService::new(&path);

        let config = service.load_with_env(env(&[])).unwrap();
        assert_eq!(config.autosave_interval_secs, 12);
        assert_eq!(config.min_open_text_length, 4);

        let config = service
            .load_with_env(env(&[(ENV_AUTOSAVE_SECS, "3"), (ENV_MIN_TEXT_LENGTH, "oops")]))
            .unwrap();
        assert_eq!(config.autosave_interval_secs, 3);
        assert_eq!(config.min_open_text_length, 4);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "autosave_interval_secs = \"soon\"").unwrap();

        let err = ConfigService::new(&path).load_with_env(env(&[])).unwrap_err();
        assert!(matches!(err, StudyError::Config(_)));
    }

    #[test]
    fn test_get_config_caches_until_invalidated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "followup_max_questions = 2").unwrap();
        let service = ConfigService::new(&path);
        assert_eq!(service.get_config().followup_max_questions, 2);

        std::fs::write(&path, "followup_max_questions = 5").unwrap();
        assert_eq!(service.get_config().followup_max_questions, 2);

        service.invalidate_cache();
        assert_eq!(service.get_config().followup_max_questions, 5);
    }
}
