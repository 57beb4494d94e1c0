//! Arrays of device pointers for batched kernels.
//!
//! Batched LU routines take one device address per matrix. The addresses are
//! an arithmetic progression over the base address of a single batch buffer,
//! so they are computed on the host and uploaded; matrix data is never
//! copied.
//!
//! A [`DevicePointerArray`] borrows its source buffer for `'a`, and so does
//! the uploaded [`DevicePointerBuffer`]. Neither can outlive the memory the
//! addresses point into.

use crate::device::{Device, DeviceBuffer, DevicePtr};
use crate::error::{Error, Result};
use batchinv_core::DeviceScalar;
use std::marker::PhantomData;

/// Host-side list of matrix start addresses within one buffer.
#[derive(Debug)]
pub struct DevicePointerArray<'a, T> {
    addresses: Vec<u64>,
    _source: PhantomData<&'a T>,
}

/// `count` addresses starting at `base`, `stride_bytes` apart.
fn stride_progression(base: u64, stride_bytes: u64, count: usize) -> Vec<u64> {
    (0..count as u64).map(|i| base + i * stride_bytes).collect()
}

impl<'a, T: DeviceScalar> DevicePointerArray<'a, T> {
    /// Addresses of `count` matrices spaced `matrix_stride` elements apart.
    ///
    /// Fails if the last matrix would start outside `source`.
    pub fn build<B: DeviceBuffer<T>>(
        source: &'a B,
        matrix_stride: usize,
        count: usize,
    ) -> Result<Self> {
        if count > 0 && (count - 1) * matrix_stride >= source.len() {
            return Err(Error::InvalidArgument(format!(
                "{} matrices with stride {} do not fit in a buffer of {} elements",
                count,
                matrix_stride,
                source.len()
            )));
        }

        let stride_bytes = (matrix_stride * std::mem::size_of::<T>()) as u64;
        let addresses = stride_progression(source.device_ptr().addr(), stride_bytes, count);

        Ok(Self {
            addresses,
            _source: PhantomData,
        })
    }

    pub fn addresses(&self) -> &[u64] {
        &self.addresses
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Copy the addresses into device memory.
    pub fn upload<D: Device>(&self, device: &D) -> Result<DevicePointerBuffer<'a, D>> {
        let buffer = device.upload(&self.addresses)?;
        log::debug!(
            "Uploaded pointer array of {} entries to {}",
            self.addresses.len(),
            device.name()
        );
        Ok(DevicePointerBuffer {
            buffer,
            _source: PhantomData,
        })
    }
}

/// Device-resident pointer array, valid while its source buffer is borrowed.
pub struct DevicePointerBuffer<'a, D: Device> {
    buffer: D::Buffer<u64>,
    _source: PhantomData<&'a ()>,
}

impl<D: Device> DevicePointerBuffer<'_, D> {
    pub fn device_ptr(&self) -> DevicePtr<u64> {
        self.buffer.device_ptr()
    }

    pub fn buffer(&self) -> &D::Buffer<u64> {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeBuffer {
        base: u64,
        len: usize,
    }

    impl DeviceBuffer<f32> for FakeBuffer {
        fn len(&self) -> usize {
            self.len
        }

        fn device_ptr(&self) -> DevicePtr<f32> {
            DevicePtr::new(self.base)
        }
    }

    #[test]
    fn test_stride_progression() {
        assert_eq!(stride_progression(100, 16, 3), vec![100, 116, 132]);
        assert!(stride_progression(100, 16, 0).is_empty());
    }

    #[test]
    fn test_build_spacing() {
        let source = FakeBuffer {
            base: 0x4000,
            len: 4 * 9,
        };
        let array = DevicePointerArray::build(&source, 9, 4).unwrap();
        assert_eq!(array.len(), 4);
        for (i, pair) in array.addresses().windows(2).enumerate() {
            assert_eq!(pair[1] - pair[0], 9 * 4, "gap after matrix {}", i);
        }
        assert_eq!(array.addresses()[0], 0x4000);
    }

    #[test]
    fn test_build_out_of_bounds() {
        let source = FakeBuffer {
            base: 0x4000,
            len: 10,
        };
        assert!(DevicePointerArray::build(&source, 4, 3).is_ok());
        assert!(DevicePointerArray::build(&source, 5, 3).is_err());
    }

    #[test]
    fn test_build_empty() {
        let source = FakeBuffer { base: 0, len: 0 };
        let array = DevicePointerArray::build(&source, 4, 0).unwrap();
        assert!(array.is_empty());
    }
}
