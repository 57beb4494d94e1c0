//! Execution strategies for multi-matrix batches.
//!
//! Both strategies invert a working copy `work` (overwritten with LU factors)
//! into `output`, which must hold identity matrices on entry.

use crate::batch::DeviceBatch;
use crate::device::{DeviceBuffer, DevicePtr, LuKernels};
use crate::error::Result;
use crate::pointer_array::DevicePointerArray;
use crate::select::InverseConfig;
use crate::status::{Phase, StatusPairs};
use batchinv_core::Element;

/// Status phases written by [`solve_unit`].
pub const LOOPED_PHASES: [Phase; 2] = [Phase::Factorize, Phase::Solve];

/// Status phases written by [`run_fused_batched`].
pub const FUSED_PHASES: [Phase; 2] = [Phase::BatchedFactorize, Phase::BatchedInvert];

/// Invert one matrix: factorize `a` in place, then solve against `b`.
///
/// `status[0]` receives the factorization code and `status[1]` the solve
/// code. `b` must contain the identity on entry and holds the inverse once
/// the stream completes.
///
/// # Safety
///
/// `a` and `b` must address `n * n` elements, `pivots` `n` elements and
/// `status` two elements of live buffers on `device`, none of them touched by
/// other in-flight work.
#[allow(clippy::too_many_arguments)]
pub unsafe fn solve_unit<D, T>(
    device: &D,
    stream: &D::Stream,
    n: usize,
    a: DevicePtr<T>,
    b: DevicePtr<T>,
    pivots: DevicePtr<i32>,
    status: DevicePtr<i32>,
) -> Result<()>
where
    D: LuKernels<T>,
    T: Element,
{
    device.factorize(stream, n, a, n, pivots, status)?;
    device.solve(stream, n, n, a, n, pivots, b, n, status.add(1))
}

/// One [`solve_unit`] launch per matrix, spread over a pool of streams.
///
/// Matrix `i` runs on stream `i % pool` with its own pivot slice and status
/// pair in `status`, which must hold `2 * batch` zeroed codes. Every launched
/// stream is joined before returning, also when a launch fails.
pub fn run_parallel_streams<D, T>(
    device: &D,
    config: &InverseConfig,
    work: &DeviceBatch<D, T>,
    output: &DeviceBatch<D, T>,
    status: &D::Buffer<i32>,
) -> Result<()>
where
    D: LuKernels<T>,
    T: Element,
{
    let batch = work.batch_size();
    let n = work.matrix_size();
    if batch == 0 {
        return Ok(());
    }
    debug_assert!(status.len() >= 2 * batch);

    let pivots: D::Buffer<i32> = device.alloc_zeros(batch * n)?;
    let pool = config.stream_pool_size.clamp(1, batch);
    let streams = device.create_streams(pool)?;

    log::debug!(
        "Launching {} inversions of {}x{} on {} streams",
        batch,
        n,
        n,
        pool
    );

    let launched = (0..batch).try_for_each(|i| {
        // SAFETY: slices are disjoint per matrix (stride >= n*n, pivot and
        // status offsets scale with i) and all buffers outlive the join below.
        unsafe {
            solve_unit(
                device,
                &streams[i % pool],
                n,
                work.matrix_ptr(i),
                output.matrix_ptr(i),
                pivots.device_ptr().add(i * n),
                status.device_ptr().add(2 * i),
            )
        }
    });
    let joined = device.join(&streams);

    launched?;
    joined
}

/// One batched factorize and one batched invert over the whole batch.
///
/// Returns the per-matrix codes of both calls as status pairs.
pub fn run_fused_batched<D, T>(
    device: &D,
    work: &DeviceBatch<D, T>,
    output: &DeviceBatch<D, T>,
) -> Result<StatusPairs>
where
    D: LuKernels<T>,
    T: Element,
{
    let batch = work.batch_size();
    let n = work.matrix_size();
    if batch == 0 {
        return StatusPairs::from_interleaved(Vec::new(), FUSED_PHASES);
    }

    let a_array = DevicePointerArray::build(work.buffer(), work.matrix_stride(), batch)?;
    let c_array = DevicePointerArray::build(output.buffer(), output.matrix_stride(), batch)?;
    let a_ptrs = a_array.upload(device)?;
    let c_ptrs = c_array.upload(device)?;

    let pivots: D::Buffer<i32> = device.alloc_zeros(batch * n)?;
    let factor_info: D::Buffer<i32> = device.alloc_zeros(batch)?;
    let invert_info: D::Buffer<i32> = device.alloc_zeros(batch)?;
    let stream = device.default_stream();

    log::debug!("Fused inversion of {} matrices ({}x{})", batch, n, n);

    // SAFETY: pointer arrays address `batch` matrices inside `work` and
    // `output`, which are borrowed for the whole call; scratch buffers are
    // sized batch*n and batch and live until after the synchronize.
    let launched = unsafe {
        device
            .batched_factorize(
                stream,
                n,
                a_ptrs.device_ptr(),
                n,
                pivots.device_ptr(),
                factor_info.device_ptr(),
                batch,
            )
            .and_then(|()| {
                device.batched_invert(
                    stream,
                    n,
                    a_ptrs.device_ptr(),
                    n,
                    pivots.device_ptr(),
                    c_ptrs.device_ptr(),
                    n,
                    invert_info.device_ptr(),
                    batch,
                )
            })
    };
    let synced = device.synchronize(stream);
    launched?;
    synced?;

    let factor_codes = device.download(&factor_info)?;
    let invert_codes = device.download(&invert_info)?;
    StatusPairs::from_phases(&factor_codes, &invert_codes, FUSED_PHASES)
}
