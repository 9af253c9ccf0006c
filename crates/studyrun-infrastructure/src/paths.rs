//! Unified path management for studyrun files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/studyrun/          # Config directory
//! └── config.toml              # Engine configuration
//!
//! ~/.local/share/studyrun/     # Data directory
//! ├── progress/                # Live progress snapshots (<session>.json)
//! ├── archive/                 # Snapshots of finished sessions
//! └── responses/               # Per-session response logs (<session>.jsonl)
//! ```

use std::path::{Path, PathBuf};

const APP_NAME: &str = "studyrun";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

pub struct StudyrunPaths;

impl StudyrunPaths {
    /// Returns the studyrun configuration directory (e.g. `~/.config/studyrun/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the studyrun data directory (e.g. `~/.local/share/studyrun/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn progress_dir(data_dir: &Path) -> PathBuf {
        data_dir.join("progress")
    }

    pub fn archive_dir(data_dir: &Path) -> PathBuf {
        data_dir.join("archive")
    }

    pub fn responses_dir(data_dir: &Path) -> PathBuf {
        data_dir.join("responses")
    }
}

/// Rejects ids that would escape their directory once used as a file stem.
pub(crate) fn check_file_stem(kind: &str, id: &str) -> Result<(), String> {
    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\'])
        && !id.contains('\0');
    if valid {
        Ok(())
    } else {
        Err(format!("invalid {} id '{}'", kind, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_layout() {
        let base = Path::new("/tmp/studyrun");
        assert_eq!(StudyrunPaths::progress_dir(base), base.join("progress"));
        assert_eq!(StudyrunPaths::archive_dir(base), base.join("archive"));
        assert_eq!(StudyrunPaths::responses_dir(base), base.join("responses"));
    }

    #[test]
    fn test_check_file_stem() {
        assert!(check_file_stem("session", "abc-123").is_ok());
        assert!(check_file_stem("session", "").is_err());
        assert!(check_file_stem("session", "..").is_err());
        assert!(check_file_stem("study", "../etc").is_err());
        assert!(check_file_stem("study", "a\\b").is_err());
    }
}
