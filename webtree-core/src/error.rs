use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tree file not found: {}", .0.display())]
    NotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, TreeError>;
