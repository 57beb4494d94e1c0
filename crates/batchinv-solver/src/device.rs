//! Device, stream and kernel abstractions.
//!
//! The engine never touches device memory directly. It allocates buffers,
//! computes typed device addresses ([`DevicePtr`]) into them and hands those
//! addresses to the four LU primitives of [`LuKernels`]. Backends decide what
//! a buffer, an address and a stream are: real GPU memory and CUDA streams,
//! or host memory and deferred work queues.

use crate::error::Result;
use batchinv_core::{DeviceScalar, Element};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Typed address of an element in device memory.
pub struct DevicePtr<T> {
    addr: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> DevicePtr<T> {
    pub const fn new(addr: u64) -> Self {
        Self {
            addr,
            _marker: PhantomData,
        }
    }

    /// Raw address in bytes.
    pub fn addr(self) -> u64 {
        self.addr
    }

    /// Address `count` elements further on.
    pub fn add(self, count: usize) -> Self {
        Self::new(self.addr + (count * std::mem::size_of::<T>()) as u64)
    }
}

impl<T> Clone for DevicePtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DevicePtr<T> {}

impl<T> PartialEq for DevicePtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr
    }
}

impl<T> Eq for DevicePtr<T> {}

impl<T> Hash for DevicePtr<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr.hash(state);
    }
}

impl<T> fmt::Debug for DevicePtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DevicePtr({:#x})", self.addr)
    }
}

/// Owned allocation in device memory.
///
/// Dropping the buffer releases the memory; addresses taken from it must not
/// be used afterwards.
pub trait DeviceBuffer<S: DeviceScalar>: Send + Sync {
    /// Length in elements.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Address of the first element.
    fn device_ptr(&self) -> DevicePtr<S>;
}

/// Execution context: memory management and streams.
///
/// Transfers (`upload`, `download`, `duplicate`) are ordered with respect to
/// the default stream. Work enqueued on streams from [`Device::create_streams`]
/// is only guaranteed complete after [`Device::join`].
pub trait Device: Send + Sync {
    type Buffer<S: DeviceScalar>: DeviceBuffer<S>;
    type Stream: Send + Sync;

    /// Short name for display.
    fn name(&self) -> &str;

    fn default_stream(&self) -> &Self::Stream;

    /// Create `count` streams whose work may run concurrently.
    fn create_streams(&self, count: usize) -> Result<Vec<Self::Stream>>;

    /// Block until all work on `streams` has completed.
    fn join(&self, streams: &[Self::Stream]) -> Result<()>;

    /// Block until all work on `stream` has completed.
    fn synchronize(&self, stream: &Self::Stream) -> Result<()>;

    fn alloc_zeros<S: DeviceScalar>(&self, len: usize) -> Result<Self::Buffer<S>>;

    fn upload<S: DeviceScalar>(&self, host: &[S]) -> Result<Self::Buffer<S>>;

    fn download<S: DeviceScalar>(&self, buffer: &Self::Buffer<S>) -> Result<Vec<S>>;

    /// Device-side copy of a whole buffer.
    fn duplicate<S: DeviceScalar>(&self, buffer: &Self::Buffer<S>) -> Result<Self::Buffer<S>>;
}

/// LU factorization primitives for one element type.
///
/// Matrices are column-major with leading dimension `lda`/`ldb`/`ldc`.
/// Pivots are 1-based row indices. Info codes follow LAPACK: `0` on success,
/// `k > 0` when `U(k, k)` is exactly zero, `-k` when argument `k` is invalid.
/// An `Err` return is a call-level failure of the backend itself.
///
/// # Safety
///
/// Every method takes raw device addresses. Callers must guarantee that each
/// address points into a live buffer of this device covering the extent the
/// routine touches, that the buffers outlive the enqueued work, and that work
/// running concurrently on different streams writes disjoint memory.
pub trait LuKernels<T: Element>: Device {
    /// Factorize one `n × n` matrix in place; writes one info code.
    unsafe fn factorize(
        &self,
        stream: &Self::Stream,
        n: usize,
        a: DevicePtr<T>,
        lda: usize,
        pivots: DevicePtr<i32>,
        info: DevicePtr<i32>,
    ) -> Result<()>;

    /// Solve `A X = B` in place on `b` using factors from [`LuKernels::factorize`].
    #[allow(clippy::too_many_arguments)]
    unsafe fn solve(
        &self,
        stream: &Self::Stream,
        n: usize,
        nrhs: usize,
        a: DevicePtr<T>,
        lda: usize,
        pivots: DevicePtr<i32>,
        b: DevicePtr<T>,
        ldb: usize,
        info: DevicePtr<i32>,
    ) -> Result<()>;

    /// Factorize `batch` matrices addressed by a device array of pointers.
    #[allow(clippy::too_many_arguments)]
    unsafe fn batched_factorize(
        &self,
        stream: &Self::Stream,
        n: usize,
        a_array: DevicePtr<u64>,
        lda: usize,
        pivots: DevicePtr<i32>,
        infos: DevicePtr<i32>,
        batch: usize,
    ) -> Result<()>;

    /// Write the inverse of each factored matrix into the matching `c_array`
    /// matrix.
    #[allow(clippy::too_many_arguments)]
    unsafe fn batched_invert(
        &self,
        stream: &Self::Stream,
        n: usize,
        a_array: DevicePtr<u64>,
        lda: usize,
        pivots: DevicePtr<i32>,
        c_array: DevicePtr<u64>,
        ldc: usize,
        infos: DevicePtr<i32>,
        batch: usize,
    ) -> Result<()>;
}
