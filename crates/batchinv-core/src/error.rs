//! Error types for batchinv-core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid shape {shape:?}: {reason}")]
    InvalidShape { shape: Vec<usize>, reason: String },

    #[error("matrices must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("data length mismatch: shape needs {expected} elements, got {actual}")]
    DataLength { expected: usize, actual: usize },

    #[error("expected a tensor with at least 2 dimensions, got {ndim}")]
    RankTooSmall { ndim: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
