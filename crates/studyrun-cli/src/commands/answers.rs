use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use studyrun_core::response::Payload;

/// Scripted participant answers, keyed by block id.
///
/// ```toml
/// [likes]
/// answer = "yes"
///
/// [story]
/// text = "It was quick to set up."
/// ```
#[derive(Debug, Default)]
pub struct Answers {
    by_block: HashMap<String, Payload>,
}

impl Answers {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read answers file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let by_block: HashMap<String, Payload> = toml::from_str(content)?;
        Ok(Self { by_block })
    }

    /// Blocks without an entry are submitted with an empty payload.
    pub fn payload_for(&self, block_id: &str) -> Payload {
        self.by_block.get(block_id).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_block.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_parse_tables_per_block() {
        let answers = Answers::parse(
            r#"
            [likes]
            answer = "yes"

            [pick]
            selected = ["a", "c"]

            [scale]
            value = 4
            "#,
        )
        .unwrap();

        assert_eq!(answers.len(), 3);
        assert_eq!(answers.payload_for("likes")["answer"], json!("yes"));
        assert_eq!(answers.payload_for("pick")["selected"], json!(["a", "c"]));
        assert_eq!(answers.payload_for("scale")["value"], json!(4));
    }

    #[test]
    fn test_missing_block_gets_empty_payload() {
        let answers = Answers::parse("").unwrap();
        assert!(answers.payload_for("welcome").is_empty());
    }

    #[test]
    fn test_top_level_scalar_is_rejected() {
        assert!(Answers::parse("likes = \"yes\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[story]\ntext = \"Quick to set up\"").unwrap();

        let answers = Answers::load(file.path()).unwrap();
        assert_eq!(answers.payload_for("story")["text"], json!("Quick to set up"));
    }
}
