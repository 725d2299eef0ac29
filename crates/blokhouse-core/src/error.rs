use thiserror::Error;

use crate::types::AssetId;

/// Errors returned by asset directory operations.
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Asset not found: {0}")]
    NotFound(AssetId),

    #[error("Asset id already in use: {0}")]
    DuplicateId(AssetId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DirectoryError>;
