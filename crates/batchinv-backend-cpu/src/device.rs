//! Host implementation of the device seam.

use crate::buffer::HostBuffer;
use crate::lu;
use crate::stream::HostStream;
use batchinv_core::{DeviceScalar, Element};
use batchinv_solver::{Device, DevicePtr, Error, LuKernels, Result};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Emulated device over host memory.
///
/// Kernels are queued on a [`HostStream`] and only run when that stream is
/// synchronized or joined. Transfers drain the default stream first, so
/// they observe every kernel enqueued there. Streams handed out by
/// `create_streams` start after all default-stream work submitted before them.
pub struct HostDevice {
    default_stream: HostStream,
    next_stream: AtomicUsize,
}

impl HostDevice {
    pub fn new() -> Self {
        log::info!(
            "Host device initialized ({} worker threads)",
            rayon::current_num_threads()
        );
        Self {
            default_stream: HostStream::new(0),
            next_stream: AtomicUsize::new(1),
        }
    }

    /// Read the element a device address points at.
    ///
    /// Returns `None` when `ptr` is outside `buffer` or not on an element
    /// boundary. Drains the default stream first.
    pub fn element_at<S: DeviceScalar>(&self, buffer: &HostBuffer<S>, ptr: DevicePtr<S>) -> Option<S> {
        self.default_stream.drain();
        buffer.element_at(ptr)
    }
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for HostDevice {
    type Buffer<S: DeviceScalar> = HostBuffer<S>;
    type Stream = HostStream;

    fn name(&self) -> &str {
        "cpu"
    }

    fn default_stream(&self) -> &HostStream {
        &self.default_stream
    }

    fn create_streams(&self, count: usize) -> Result<Vec<HostStream>> {
        self.default_stream.drain();
        let first = self.next_stream.fetch_add(count, Ordering::Relaxed);
        Ok((first..first + count).map(HostStream::new).collect())
    }

    fn join(&self, streams: &[HostStream]) -> Result<()> {
        streams.par_iter().for_each(HostStream::drain);
        Ok(())
    }

    fn synchronize(&self, stream: &HostStream) -> Result<()> {
        stream.drain();
        Ok(())
    }

    fn alloc_zeros<S: DeviceScalar>(&self, len: usize) -> Result<HostBuffer<S>> {
        Ok(HostBuffer::zeroed(len))
    }

    fn upload<S: DeviceScalar>(&self, host: &[S]) -> Result<HostBuffer<S>> {
        Ok(HostBuffer::from_vec(host.to_vec()))
    }

    fn download<S: DeviceScalar>(&self, buffer: &HostBuffer<S>) -> Result<Vec<S>> {
        self.default_stream.drain();
        Ok(buffer.to_vec())
    }

    fn duplicate<S: DeviceScalar>(&self, buffer: &HostBuffer<S>) -> Result<HostBuffer<S>> {
        self.default_stream.drain();
        Ok(HostBuffer::from_vec(buffer.to_vec()))
    }
}

fn non_null<S>(ptr: DevicePtr<S>, what: &str) -> Result<DevicePtr<S>> {
    if ptr.addr() == 0 {
        Err(Error::Backend(format!("null {} pointer", what)))
    } else {
        Ok(ptr)
    }
}

unsafe fn slice_mut<'a, S>(ptr: DevicePtr<S>, len: usize) -> &'a mut [S] {
    if len == 0 {
        return &mut [];
    }
    std::slice::from_raw_parts_mut(ptr.addr() as usize as *mut S, len)
}

unsafe fn slice<'a, S>(ptr: DevicePtr<S>, len: usize) -> &'a [S] {
    if len == 0 {
        return &[];
    }
    std::slice::from_raw_parts(ptr.addr() as usize as *const S, len)
}

unsafe fn store<S>(ptr: DevicePtr<S>, value: S) {
    (ptr.addr() as usize as *mut S).write(value)
}

impl<T: Element> LuKernels<T> for HostDevice {
    unsafe fn factorize(
        &self,
        stream: &HostStream,
        n: usize,
        a: DevicePtr<T>,
        lda: usize,
        pivots: DevicePtr<i32>,
        info: DevicePtr<i32>,
    ) -> Result<()> {
        let a = non_null(a, "matrix")?;
        let info = non_null(info, "info")?;
        stream.enqueue(move || {
            // SAFETY: the caller guarantees live, exclusive extents for the
            // lifetime of the queued work.
            unsafe {
                let ipiv = slice_mut(pivots, n);
                let code = lu::getrf(n, slice_mut(a, lu::extent(n, n, lda)), lda, ipiv);
                store(info, code);
            }
        });
        Ok(())
    }

    unsafe fn solve(
        &self,
        stream: &HostStream,
        n: usize,
        nrhs: usize,
        a: DevicePtr<T>,
        lda: usize,
        pivots: DevicePtr<i32>,
        b: DevicePtr<T>,
        ldb: usize,
        info: DevicePtr<i32>,
    ) -> Result<()> {
        let a = non_null(a, "matrix")?;
        let b = non_null(b, "right-hand side")?;
        let info = non_null(info, "info")?;
        stream.enqueue(move || {
            // SAFETY: as in `factorize`.
            unsafe {
                let code = lu::getrs(
                    n,
                    nrhs,
                    slice(a, lu::extent(n, n, lda)),
                    lda,
                    slice(pivots, n),
                    slice_mut(b, lu::extent(n, nrhs, ldb)),
                    ldb,
                );
                store(info, code);
            }
        });
        Ok(())
    }

    unsafe fn batched_factorize(
        &self,
        stream: &HostStream,
        n: usize,
        a_array: DevicePtr<u64>,
        lda: usize,
        pivots: DevicePtr<i32>,
        infos: DevicePtr<i32>,
        batch: usize,
    ) -> Result<()> {
        if batch == 0 {
            return Ok(());
        }
        let a_array = non_null(a_array, "pointer array")?;
        let infos = non_null(infos, "info")?;
        log::trace!("getrfBatched n={} batch={} on stream {}", n, batch, stream.id());
        stream.enqueue(move || {
            // SAFETY: every pointer in `a_array` addresses a distinct live
            // matrix, and pivot/info slots are disjoint per matrix.
            let matrices = unsafe { slice(a_array, batch) };
            matrices.par_iter().enumerate().for_each(|(i, &addr)| unsafe {
                let a = slice_mut(DevicePtr::<T>::new(addr), lu::extent(n, n, lda));
                let code = lu::getrf(n, a, lda, slice_mut(pivots.add(i * n), n));
                store(infos.add(i), code);
            });
        });
        Ok(())
    }

    unsafe fn batched_invert(
        &self,
        stream: &HostStream,
        n: usize,
        a_array: DevicePtr<u64>,
        lda: usize,
        pivots: DevicePtr<i32>,
        c_array: DevicePtr<u64>,
        ldc: usize,
        infos: DevicePtr<i32>,
        batch: usize,
    ) -> Result<()> {
        if batch == 0 {
            return Ok(());
        }
        let a_array = non_null(a_array, "pointer array")?;
        let c_array = non_null(c_array, "pointer array")?;
        let infos = non_null(infos, "info")?;
        log::trace!("getriBatched n={} batch={} on stream {}", n, batch, stream.id());
        stream.enqueue(move || {
            // SAFETY: as in `batched_factorize`; outputs are disjoint from
            // the factors.
            let (factors, outputs) = unsafe { (slice(a_array, batch), slice(c_array, batch)) };
            factors
                .par_iter()
                .zip(outputs.par_iter())
                .enumerate()
                .for_each(|(i, (&a, &c))| unsafe {
                    let code = lu::getri(
                        n,
                        slice(DevicePtr::<T>::new(a), lu::extent(n, n, lda)),
                        lda,
                        slice(pivots.add(i * n), n),
                        slice_mut(DevicePtr::<T>::new(c), lu::extent(n, n, ldc)),
                        ldc,
                    );
                    store(infos.add(i), code);
                });
        });
        Ok(())
    }
}
