//! Strided host container for stacks of matrices.
//!
//! A [`MatrixBatch`] is an N-dimensional tensor whose trailing two dimensions
//! are the matrix rows and columns; the leading dimensions enumerate the
//! batch. Element positions are computed from per-dimension strides, so
//! layout changes such as [`MatrixBatch::transpose_last_two`] only permute
//! strides and never touch data.
//!
//! Device backends expect the *batched column-major* layout: each matrix is
//! column-major and matrices follow each other with a stride of `rows * cols`.
//! [`MatrixBatch::to_column_major`] materializes that layout.

use crate::element::Element;
use crate::error::{Error, Result};

/// Host-side strided batch of matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixBatch<T> {
    data: Vec<T>,
    shape: Vec<usize>,
    /// Element strides, one per dimension.
    strides: Vec<usize>,
}

/// Row-major (C order) strides for a shape.
pub fn contiguous_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; shape.len()];
    let mut running = 1;
    for (stride, &dim) in strides.iter_mut().zip(shape).rev() {
        *stride = running;
        running *= dim.max(1);
    }
    strides
}

/// Strides of the batched column-major layout for a shape with `ndim >= 2`.
pub fn column_major_strides(shape: &[usize]) -> Vec<usize> {
    let ndim = shape.len();
    let rows = shape[ndim - 2];
    let cols = shape[ndim - 1];
    let mut strides = contiguous_strides(shape);
    let matrix_numel = rows.max(1) * cols.max(1);
    let mut running = matrix_numel;
    for d in (0..ndim - 2).rev() {
        strides[d] = running;
        running *= shape[d].max(1);
    }
    strides[ndim - 2] = 1;
    strides[ndim - 1] = rows.max(1);
    strides
}

fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

impl<T: Element> MatrixBatch<T> {
    /// Build from row-major (C order) data.
    pub fn from_vec(shape: &[usize], data: Vec<T>) -> Result<Self> {
        let expected = numel(shape);
        if data.len() != expected {
            return Err(Error::DataLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            strides: contiguous_strides(shape),
            shape: shape.to_vec(),
            data,
        })
    }

    /// Build from data laid out in batched column-major order.
    pub fn from_column_major(shape: &[usize], data: Vec<T>) -> Result<Self> {
        if shape.len() < 2 {
            return Err(Error::RankTooSmall { ndim: shape.len() });
        }
        let expected = numel(shape);
        if data.len() != expected {
            return Err(Error::DataLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            strides: column_major_strides(shape),
            shape: shape.to_vec(),
            data,
        })
    }

    /// Build from explicit element strides.
    ///
    /// Every addressable position must fall inside `data`.
    pub fn from_strided(shape: &[usize], strides: &[usize], data: Vec<T>) -> Result<Self> {
        if shape.len() != strides.len() {
            return Err(Error::InvalidShape {
                shape: shape.to_vec(),
                reason: format!("{} strides given for {} dimensions", strides.len(), shape.len()),
            });
        }
        if numel(shape) > 0 {
            let last_offset: usize = shape
                .iter()
                .zip(strides)
                .map(|(&dim, &stride)| (dim - 1) * stride)
                .sum();
            if last_offset >= data.len() {
                return Err(Error::DataLength {
                    expected: last_offset + 1,
                    actual: data.len(),
                });
            }
        }
        Ok(Self {
            data,
            shape: shape.to_vec(),
            strides: strides.to_vec(),
        })
    }

    /// All-zero batch in row-major layout.
    pub fn zeros(shape: &[usize]) -> Self {
        Self::filled(shape, T::zero())
    }

    /// Batch with every element set to `value`, row-major layout.
    pub fn filled(shape: &[usize], value: T) -> Self {
        Self {
            data: vec![value; numel(shape)],
            shape: shape.to_vec(),
            strides: contiguous_strides(shape),
        }
    }

    /// Embed the last dimension as the diagonal of square matrices.
    ///
    /// A tensor of shape `[..., n]` becomes `[..., n, n]` (row-major) with
    /// zeros off the diagonal.
    pub fn diag_embed(diagonals: &Self) -> Self {
        let n = diagonals.shape.last().copied().unwrap_or(1);
        let lead = &diagonals.shape[..diagonals.shape.len().saturating_sub(1)];
        let mut shape = lead.to_vec();
        shape.extend([n, n]);

        let mut out = Self::zeros(&shape);
        let vectors = numel(lead);
        let mut index = vec![0; diagonals.shape.len()];
        for v in 0..vectors {
            unravel(v, lead, &mut index[..lead.len()]);
            for i in 0..n {
                if let Some(last) = index.last_mut() {
                    *last = i;
                }
                let value = diagonals.data[diagonals.offset(&index)];
                out.data[v * n * n + i * n + i] = value;
            }
        }
        out
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of logical elements.
    pub fn numel(&self) -> usize {
        numel(&self.shape)
    }

    /// Raw storage in its current layout.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Leading (batch) dimensions.
    pub fn batch_dims(&self) -> &[usize] {
        &self.shape[..self.shape.len().saturating_sub(2)]
    }

    /// Number of matrices in the batch.
    pub fn batch_size(&self) -> usize {
        numel(self.batch_dims())
    }

    /// Side length of the square matrices in this batch.
    pub fn square_size(&self) -> Result<usize> {
        square_size(&self.shape)
    }

    /// Element at a full multi-dimensional index.
    ///
    /// # Panics
    ///
    /// Panics if the index has the wrong rank or is out of bounds.
    pub fn get(&self, index: &[usize]) -> T {
        assert_eq!(index.len(), self.ndim(), "index rank mismatch");
        for (&i, &dim) in index.iter().zip(&self.shape) {
            assert!(i < dim, "index {:?} out of bounds for shape {:?}", index, self.shape);
        }
        self.data[self.offset(index)]
    }

    /// Element `(row, col)` of the `batch`-th matrix (row-major batch order).
    pub fn at(&self, batch: usize, row: usize, col: usize) -> T {
        let mut index = vec![0; self.ndim()];
        let nb = self.ndim() - 2;
        unravel(batch, &self.shape[..nb], &mut index[..nb]);
        index[nb] = row;
        index[nb + 1] = col;
        self.get(&index)
    }

    /// Values of one matrix in row-major order.
    pub fn matrix_rows(&self, batch: usize) -> Vec<T> {
        let nb = self.ndim() - 2;
        let (rows, cols) = (self.shape[nb], self.shape[nb + 1]);
        let mut out = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                out.push(self.at(batch, r, c));
            }
        }
        out
    }

    /// All logical values in row-major (C) order, independent of layout.
    pub fn to_row_major_vec(&self) -> Vec<T> {
        let total = self.numel();
        let mut out = Vec::with_capacity(total);
        let mut index = vec![0; self.ndim()];
        for linear in 0..total {
            unravel(linear, &self.shape, &mut index);
            out.push(self.data[self.offset(&index)]);
        }
        out
    }

    /// Swap the last two dimensions by permuting strides only.
    pub fn transpose_last_two(mut self) -> Self {
        let nd = self.ndim();
        if nd >= 2 {
            self.shape.swap(nd - 2, nd - 1);
            self.strides.swap(nd - 2, nd - 1);
        }
        self
    }

    /// Whether storage is already batched column-major and tightly packed.
    pub fn is_batched_column_major(&self) -> bool {
        if self.ndim() < 2 || self.data.len() != self.numel() {
            return false;
        }
        let expected = column_major_strides(&self.shape);
        self.shape
            .iter()
            .zip(self.strides.iter().zip(&expected))
            .all(|(&dim, (&actual, &wanted))| dim <= 1 || actual == wanted)
    }

    /// Copy into batched column-major layout.
    pub fn to_column_major(&self) -> Result<Self> {
        if self.ndim() < 2 {
            return Err(Error::RankTooSmall { ndim: self.ndim() });
        }
        if self.is_batched_column_major() {
            return Ok(Self {
                data: self.data.clone(),
                shape: self.shape.clone(),
                strides: column_major_strides(&self.shape),
            });
        }
        let nb = self.ndim() - 2;
        let (rows, cols) = (self.shape[nb], self.shape[nb + 1]);
        let mut data = Vec::with_capacity(self.numel());
        for b in 0..self.batch_size() {
            for c in 0..cols {
                for r in 0..rows {
                    data.push(self.at(b, r, c));
                }
            }
        }
        Self::from_column_major(&self.shape, data)
    }

    fn offset(&self, index: &[usize]) -> usize {
        index.iter().zip(&self.strides).map(|(&i, &s)| i * s).sum()
    }
}

/// Validate that a shape describes a batch of square matrices; returns `n`.
pub fn square_size(shape: &[usize]) -> Result<usize> {
    let ndim = shape.len();
    if ndim < 2 {
        return Err(Error::RankTooSmall { ndim });
    }
    let (rows, cols) = (shape[ndim - 2], shape[ndim - 1]);
    if rows != cols {
        return Err(Error::NotSquare { rows, cols });
    }
    Ok(rows)
}

/// Row-major multi-index of a linear position.
fn unravel(mut linear: usize, shape: &[usize], index: &mut [usize]) {
    for (slot, &dim) in index.iter_mut().zip(shape).rev() {
        let dim = dim.max(1);
        *slot = linear % dim;
        linear /= dim;
    }
}
