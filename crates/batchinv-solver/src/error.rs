//! Error types for batchinv-solver.

use crate::status::Phase;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "batch element {matrix}: {phase} found diagonal element {code} to be zero, the matrix is singular"
    )]
    Singular {
        matrix: usize,
        phase: Phase,
        code: i32,
    },

    #[error("batch element {matrix}: argument {argument} to {phase} had an illegal value")]
    IllegalArgument {
        matrix: usize,
        phase: Phase,
        argument: i32,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Layout(#[from] batchinv_core::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Whether this error reports a numerically singular input matrix.
    pub fn is_singular(&self) -> bool {
        matches!(self, Error::Singular { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
