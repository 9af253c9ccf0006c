//! Block content source trait.

use super::model::Block;
use crate::error::Result;
use async_trait::async_trait;

/// Where a study's blocks come from.
///
/// Implementations fetch the full ordered list once per session; there is no
/// partial loading. Any failure must be reported as `StudyError::Load`.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Fetches all blocks of a study.
    ///
    /// # Arguments
    ///
    /// * `study_id` - The study whose blocks to fetch
    async fn fetch_blocks(&self, study_id: &str) -> Result<Vec<Block>>;
}
