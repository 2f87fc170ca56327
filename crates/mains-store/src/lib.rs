//! Persistence layer for mainsd
//!
//! Provides:
//! - Durable decision markers (one epoch-seconds integer per configured path)
//! - Per-target issued markers
//! - Episode journal (append-only JSONL)
//!
//! Marker reads are deliberately infallible: a missing or corrupt marker is
//! absence, so the decision engine self-heals instead of crash-looping on a
//! damaged state file.

mod file;
mod journal;
mod traits;

pub use file::*;
pub use journal::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
