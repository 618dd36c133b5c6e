//! Central error types for the engine (thiserror-based).

use thiserror::Error;

use crate::types::Seconds;

/// Top-level engine error.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Display error: {0}")]
    Display(#[from] DisplayError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Media decoder errors. All variants are recoverable from the frame
/// loader's point of view: a failing region is marked examined (or
/// treated as EOF) rather than retried forever.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to open {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("Seek to {time} failed: {reason}")]
    Seek { time: Seconds, reason: String },

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Display driver errors (GPU image upload path).
#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("Image upload failed: {0}")]
    Upload(String),

    #[error("Out of GPU memory: requested {requested} bytes")]
    OutOfMemory { requested: usize },
}

/// Convenience Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
