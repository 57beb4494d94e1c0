//! Column-major identity batches.

use crate::batch::{MatrixBatch, square_size};
use crate::element::Element;
use crate::error::Result;

/// Build a batch of identity matrices with the given shape.
///
/// Ones over `batch_dims ++ [n]` are diagonally embedded and the last two
/// dimensions transposed. An identity equals its transpose, so the transpose
/// only turns the row-major embedding into batched column-major storage.
pub fn identity_like<T: Element>(shape: &[usize]) -> Result<MatrixBatch<T>> {
    let n = square_size(shape)?;
    let mut ones_shape = shape[..shape.len() - 2].to_vec();
    ones_shape.push(n);
    let ones = MatrixBatch::filled(&ones_shape, T::one());
    Ok(MatrixBatch::diag_embed(&ones).transpose_last_two())
}
