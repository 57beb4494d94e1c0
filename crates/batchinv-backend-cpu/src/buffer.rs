//! Host allocations addressed like device memory.

use batchinv_core::DeviceScalar;
use batchinv_solver::{DeviceBuffer, DevicePtr};
use std::fmt;
use std::ptr::NonNull;

/// Fixed-size allocation whose address is handed to kernels as a
/// [`DevicePtr`].
///
/// Queued kernels write through raw addresses, so the buffer never hands out
/// references into its storage; contents are read by copying after the
/// relevant stream has been drained.
pub struct HostBuffer<S> {
    ptr: NonNull<[S]>,
}

// SAFETY: the buffer uniquely owns its allocation; shared access only copies
// elements out, and concurrent writes go through raw addresses under the
// `LuKernels` contract.
unsafe impl<S: Send> Send for HostBuffer<S> {}
unsafe impl<S: Sync> Sync for HostBuffer<S> {}

impl<S: DeviceScalar> HostBuffer<S> {
    pub(crate) fn from_vec(data: Vec<S>) -> Self {
        let ptr = NonNull::from(Box::leak(data.into_boxed_slice()));
        Self { ptr }
    }

    pub(crate) fn zeroed(len: usize) -> Self {
        Self::from_vec(vec![S::zeroed(); len])
    }

    pub(crate) fn addr(&self) -> u64 {
        self.ptr.as_ptr() as *mut S as u64
    }

    /// Copy the contents out.
    ///
    /// The caller must have drained every stream that writes this buffer.
    pub(crate) fn to_vec(&self) -> Vec<S> {
        // SAFETY: the allocation is live for `self`; no queued writer is
        // running per the caller's obligation.
        unsafe { self.ptr.as_ref().to_vec() }
    }

    /// Element at `ptr`, if it lies inside this buffer on an element boundary.
    pub(crate) fn element_at(&self, ptr: DevicePtr<S>) -> Option<S> {
        let size = std::mem::size_of::<S>() as u64;
        let offset = ptr.addr().checked_sub(self.addr())?;
        if offset % size != 0 {
            return None;
        }
        let index = usize::try_from(offset / size).ok()?;
        // SAFETY: as in `to_vec`.
        unsafe { self.ptr.as_ref().get(index).copied() }
    }
}

impl<S> Drop for HostBuffer<S> {
    fn drop(&mut self) {
        // SAFETY: `ptr` came from `Box::leak` in `from_vec` and is released once.
        unsafe { drop(Box::from_raw(self.ptr.as_ptr())) }
    }
}

impl<S: DeviceScalar> DeviceBuffer<S> for HostBuffer<S> {
    fn len(&self) -> usize {
        self.ptr.len()
    }

    fn device_ptr(&self) -> DevicePtr<S> {
        DevicePtr::new(self.addr())
    }
}

impl<S> fmt::Debug for HostBuffer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HostBuffer({:#x}, len {})",
            self.ptr.as_ptr() as *mut S as usize,
            self.ptr.len()
        )
    }
}
