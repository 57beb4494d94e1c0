//! Matrix batches resident in device memory.

use crate::device::{Device, DeviceBuffer, DevicePtr};
use crate::error::{Error, Result};
use batchinv_core::batch::{column_major_strides, square_size};
use batchinv_core::{Element, MatrixBatch, identity_like};

/// Batch of square column-major matrices in one device buffer.
///
/// Matrix `i` starts `i * matrix_stride` elements after the buffer start.
/// Invariant: `matrix_stride >= n * n` and the buffer covers every matrix,
/// so the per-matrix ranges never overlap.
pub struct DeviceBatch<D: Device, T: Element> {
    buffer: D::Buffer<T>,
    shape: Vec<usize>,
    matrix_stride: usize,
}

impl<D: Device, T: Element> DeviceBatch<D, T> {
    /// Wrap an existing device buffer.
    pub fn from_parts(buffer: D::Buffer<T>, shape: &[usize], matrix_stride: usize) -> Result<Self> {
        let n = square_size(shape)?;
        let batch: usize = shape[..shape.len() - 2].iter().product();

        if matrix_stride < n * n {
            return Err(Error::InvalidArgument(format!(
                "matrix stride {} is smaller than {}x{} matrix",
                matrix_stride, n, n
            )));
        }
        if batch > 0 && n > 0 {
            let needed = (batch - 1) * matrix_stride + n * n;
            if buffer.len() < needed {
                return Err(Error::InvalidArgument(format!(
                    "buffer of {} elements cannot hold {} matrices of {}x{} with stride {}",
                    buffer.len(),
                    batch,
                    n,
                    n,
                    matrix_stride
                )));
            }
        }

        Ok(Self {
            buffer,
            shape: shape.to_vec(),
            matrix_stride,
        })
    }

    /// Upload a host batch as a tightly packed column-major device batch.
    pub fn upload(device: &D, host: &MatrixBatch<T>) -> Result<Self> {
        let n = host.square_size()?;
        let packed = host.to_column_major()?;
        let buffer = device.upload(packed.data())?;
        log::debug!(
            "Uploaded {} matrices ({}x{} {}) to {}",
            host.batch_size(),
            n,
            n,
            T::KIND,
            device.name()
        );
        Self::from_parts(buffer, host.shape(), n * n)
    }

    /// Identity batch with the given shape.
    pub fn identity_like(device: &D, shape: &[usize]) -> Result<Self> {
        let eye = identity_like::<T>(shape)?;
        let n = square_size(shape)?;
        let buffer = device.upload(eye.data())?;
        Self::from_parts(buffer, shape, n * n)
    }

    /// Device-side copy with the same layout.
    pub fn duplicate(&self, device: &D) -> Result<Self> {
        Ok(Self {
            buffer: device.duplicate(&self.buffer)?,
            shape: self.shape.clone(),
            matrix_stride: self.matrix_stride,
        })
    }

    /// Copy back to the host as a packed column-major batch.
    pub fn download(&self, device: &D) -> Result<MatrixBatch<T>> {
        let data = device.download(&self.buffer)?;
        let numel: usize = self.shape.iter().product();
        let n = self.matrix_size();

        if self.matrix_stride == n * n && data.len() >= numel {
            let mut data = data;
            data.truncate(numel);
            return Ok(MatrixBatch::from_column_major(&self.shape, data)?);
        }

        let mut strides = column_major_strides(&self.shape);
        let mut running = self.matrix_stride;
        for d in (0..self.shape.len() - 2).rev() {
            strides[d] = running;
            running *= self.shape[d].max(1);
        }
        let strided = MatrixBatch::from_strided(&self.shape, &strides, data)?;
        Ok(strided.to_column_major()?)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of matrices.
    pub fn batch_size(&self) -> usize {
        self.shape[..self.shape.len() - 2].iter().product()
    }

    /// Side length of each matrix.
    pub fn matrix_size(&self) -> usize {
        self.shape[self.shape.len() - 1]
    }

    /// Element distance between consecutive matrices.
    pub fn matrix_stride(&self) -> usize {
        self.matrix_stride
    }

    pub fn buffer(&self) -> &D::Buffer<T> {
        &self.buffer
    }

    pub fn into_buffer(self) -> D::Buffer<T> {
        self.buffer
    }

    /// Address of the first element of matrix `index`.
    pub fn matrix_ptr(&self, index: usize) -> DevicePtr<T> {
        debug_assert!(index < self.batch_size().max(1));
        self.buffer.device_ptr().add(index * self.matrix_stride)
    }
}
