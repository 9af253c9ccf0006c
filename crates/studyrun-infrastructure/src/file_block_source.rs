//! File-backed study definitions.
//!
//! A study is one file in the studies directory, either `<id>.toml` or
//! `<id>.json`:
//!
//! ```toml
//! title = "Onboarding survey"
//!
//! [[blocks]]
//! id = "welcome"
//! type = "welcome"
//! order = 1
//! title = "Hi!"
//! ```

use crate::paths::check_file_stem;
use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use studyrun_core::block::{Block, BlockSource};
use studyrun_core::error::{Result, StudyError};
use tokio::fs;

/// On-disk shape of a study definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

pub struct FileBlockSource {
    studies_dir: PathBuf,
}

impl FileBlockSource {
    pub fn new(studies_dir: impl AsRef<Path>) -> Self {
        Self {
            studies_dir: studies_dir.as_ref().to_path_buf(),
        }
    }

    pub fn studies_dir(&self) -> &Path {
        &self.studies_dir
    }

    async fn locate(&self, study_id: &str) -> Option<PathBuf> {
        for extension in ["toml", "json"] {
            let candidate = self.studies_dir.join(format!("{}.{}", study_id, extension));
            if fs::try_exists(&candidate).await.unwrap_or(false) {
                return Some(candidate);
            }
        }
        None
    }

    async fn read_study(path: &Path) -> AnyResult<StudyFile> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let study = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?,
            _ => toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?,
        };
        Ok(study)
    }
}

#[async_trait]
impl BlockSource for FileBlockSource {
    async fn fetch_blocks(&self, study_id: &str) -> Result<Vec<Block>> {
        check_file_stem("study", study_id).map_err(StudyError::load)?;

        let path = self
            .locate(study_id)
            .await
            .ok_or_else(|| StudyError::load(format!("study '{}' not found", study_id)))?;

        tracing::debug!("[FileBlockSource] Loading study {} from {}", study_id, path.display());

        let study = Self::read_study(&path)
            .await
            .map_err(|e| StudyError::load(format!("{:#}", e)))?;

        if study.blocks.is_empty() {
            return Err(StudyError::load(format!("study '{}' has no blocks", study_id)));
        }
        Ok(study.blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyrun_core::block::BlockType;
    use tempfile::TempDir;

    const STUDY: &str = r#"
title = "Demo"

[[blocks]]
id = "bye"
type = "thank_you"
order = 3
title = "Thanks"

[[blocks]]
id = "welcome"
type = "welcome"
order = 1
title = "Hello"

[[blocks]]
id = "q1"
type = "yes_no"
order = 2
title = "Do you like it?"
isRequired = true
"#;

    #[tokio::test]
    async fn test_fetch_toml_study() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("demo.toml"), STUDY).unwrap();

        let blocks = FileBlockSource::new(dir.path())
            .fetch_blocks("demo")
            .await
            .unwrap();

        assert_eq!(blocks.len(), 3);
        let q1 = blocks.iter().find(|b| b.id == "q1").unwrap();
        assert_eq!(q1.block_type, BlockType::YesNo);
        assert!(q1.is_required);
    }

    #[tokio::test]
    async fn test_fetch_json_study() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("j.json"),
            r#"{"blocks": [{"id": "w", "type": "welcome", "order": 1, "title": "W",
                 "settings": {"buttonText": "Go"}}]}"#,
        )
        .unwrap();

        let blocks = FileBlockSource::new(dir.path()).fetch_blocks("j").await.unwrap();
        assert_eq!(blocks[0].setting("buttonText"), Some(&serde_json::json!("Go")));
    }

    #[tokio::test]
    async fn test_failures_are_load_errors() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("broken.toml"), "[[blocks]]\nid = 3").unwrap();
        std::fs::write(dir.path().join("empty.toml"), "title = \"nothing\"").unwrap();
        let source = FileBlockSource::new(dir.path());

        for study in ["missing", "broken", "empty", "../escape"] {
            let err = source.fetch_blocks(study).await.unwrap_err();
            assert!(err.is_load(), "{study}: {err}");
        }
    }
}
