//! Block domain module.
//!
//! # Module Structure
//!
//! - `model`: `Block`, `BlockType`, `BlockSettings`
//! - `sequence`: the immutable, ordered `BlockSequence` store
//! - `repository`: `BlockSource`, the content fetch boundary

mod model;
mod repository;
mod sequence;

pub use model::{Block, BlockSettings, BlockType};
pub use repository::BlockSource;
pub use sequence::BlockSequence;
