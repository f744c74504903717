//! Error types for the bm25ix engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("invalid query: {0}")]
    Query(String),

    #[error("index not found at {0}")]
    IndexNotFound(std::path::PathBuf),
}

pub type Result<T> = std::result::Result<T, EngineError>;
