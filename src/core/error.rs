//! Error types for AMR level partitioning

use glam::IVec3;
use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("AMR level {0} not found in dataset")]
    LevelNotFound(u32),

    #[error("Duplicate voxel at {position} in level {level}")]
    DuplicateVoxel { level: u32, position: IVec3 },

    #[error("Import error: {0}")]
    Import(String),

    #[error("Invalid spatial index: {0}")]
    InvalidIndex(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
