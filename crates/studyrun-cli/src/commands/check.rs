use anyhow::{Result, bail};
use std::path::Path;
use studyrun_core::block::{BlockSequence, BlockSource};
use studyrun_core::branch::lint_sequence;
use studyrun_infrastructure::FileBlockSource;

pub async fn run(study_dir: &Path, study: &str) -> Result<()> {
    let blocks = FileBlockSource::new(study_dir).fetch_blocks(study).await?;
    let sequence = BlockSequence::new(blocks)?;

    println!("Study '{}': {} blocks", study, sequence.len());
    for (index, block) in sequence.iter().enumerate() {
        let required = if block.is_required { " *" } else { "" };
        println!("  {:>3}. {} [{}]{}", index, block.id, block.block_type, required);
    }

    let issues = lint_sequence(&sequence);
    if issues.is_empty() {
        println!("✓ No branch configuration issues");
        return Ok(());
    }

    for issue in &issues {
        println!("✗ {}: {}", issue.block_id, issue.message);
    }
    bail!("{} branch configuration issue(s) found", issues.len())
}
