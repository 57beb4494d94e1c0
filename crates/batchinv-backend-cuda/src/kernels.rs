//! LU primitives over cuSOLVER (single matrix) and cuBLAS (batched).
//!
//! Element pointers are cast to the library's own scalar types
//! (`float`, `double`, `cuComplex`, `cuDoubleComplex`), which share the
//! layout of `f32`, `f64`, [`C32`] and [`C64`].

use crate::device::CudaDevice;
use crate::error::{CudaError, to_i32};
use batchinv_core::{C32, C64};
use batchinv_solver::{DevicePtr, LuKernels, Result};
use cudarc::cublas::sys as cublas;
use cudarc::cusolver::sys as cusolver;
use cudarc::driver::CudaStream;
use cudarc::driver::DevicePtr as _;
use std::sync::Arc;

fn check_cusolver(status: cusolver::cusolverStatus_t, call: &str) -> std::result::Result<(), CudaError> {
    if status != cusolver::cusolverStatus_t::CUSOLVER_STATUS_SUCCESS {
        return Err(CudaError::Cusolver(format!("{} failed: {:?}", call, status)));
    }
    Ok(())
}

fn check_cublas(status: cublas::cublasStatus_t, call: &str) -> std::result::Result<(), CudaError> {
    if status != cublas::cublasStatus_t::CUBLAS_STATUS_SUCCESS {
        return Err(CudaError::Cublas(format!("{} failed: {:?}", call, status)));
    }
    Ok(())
}

macro_rules! impl_lu_kernels {
    ($t:ty, $getrf_size:ident, $getrf:ident, $getrs:ident, $getrf_batched:ident, $getri_batched:ident) => {
        impl LuKernels<$t> for CudaDevice {
            unsafe fn factorize(
                &self,
                stream: &Arc<CudaStream>,
                n: usize,
                a: DevicePtr<$t>,
                lda: usize,
                pivots: DevicePtr<i32>,
                info: DevicePtr<i32>,
            ) -> Result<()> {
                let n = to_i32(n, "n")?;
                let lda = to_i32(lda, "lda")?;
                let handles = self.launch_handles()?;
                handles.bind_solver(stream)?;

                let mut lwork = 0;
                check_cusolver(
                    cusolver::$getrf_size(handles.solver, n, n, a.addr() as *mut _, lda, &mut lwork),
                    stringify!($getrf_size),
                )?;

                // Freed in stream order once the factorization has run.
                let bytes = lwork.max(1) as usize * std::mem::size_of::<$t>();
                let workspace = stream
                    .alloc_zeros::<u8>(bytes)
                    .map_err(|e| CudaError::MemoryAlloc(format!("getrf workspace: {}", e)))?;
                let (work, _work_guard) = workspace.device_ptr(stream);

                check_cusolver(
                    cusolver::$getrf(
                        handles.solver,
                        n,
                        n,
                        a.addr() as *mut _,
                        lda,
                        work as *mut _,
                        pivots.addr() as *mut i32,
                        info.addr() as *mut i32,
                    ),
                    stringify!($getrf),
                )?;
                Ok(())
            }

            unsafe fn solve(
                &self,
                stream: &Arc<CudaStream>,
                n: usize,
                nrhs: usize,
                a: DevicePtr<$t>,
                lda: usize,
                pivots: DevicePtr<i32>,
                b: DevicePtr<$t>,
                ldb: usize,
                info: DevicePtr<i32>,
            ) -> Result<()> {
                let n = to_i32(n, "n")?;
                let nrhs = to_i32(nrhs, "nrhs")?;
                let lda = to_i32(lda, "lda")?;
                let ldb = to_i32(ldb, "ldb")?;
                let handles = self.launch_handles()?;
                handles.bind_solver(stream)?;

                check_cusolver(
                    cusolver::$getrs(
                        handles.solver,
                        cusolver::cublasOperation_t::CUBLAS_OP_N,
                        n,
                        nrhs,
                        a.addr() as *const _,
                        lda,
                        pivots.addr() as *const i32,
                        b.addr() as *mut _,
                        ldb,
                        info.addr() as *mut i32,
                    ),
                    stringify!($getrs),
                )?;
                Ok(())
            }

            unsafe fn batched_factorize(
                &self,
                stream: &Arc<CudaStream>,
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
                let n = to_i32(n, "n")?;
                let lda = to_i32(lda, "lda")?;
                let batch_i32 = to_i32(batch, "batch")?;
                let handles = self.launch_handles()?;
                handles.bind_blas(stream)?;

                check_cublas(
                    cublas::$getrf_batched(
                        handles.blas,
                        n,
                        a_array.addr() as *const *mut _,
                        lda,
                        pivots.addr() as *mut i32,
                        infos.addr() as *mut i32,
                        batch_i32,
                    ),
                    stringify!($getrf_batched),
                )?;
                log::debug!("{} launched for {} matrices", stringify!($getrf_batched), batch);
                Ok(())
            }

            unsafe fn batched_invert(
                &self,
                stream: &Arc<CudaStream>,
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
                let n = to_i32(n, "n")?;
                let lda = to_i32(lda, "lda")?;
                let ldc = to_i32(ldc, "ldc")?;
                let batch_i32 = to_i32(batch, "batch")?;
                let handles = self.launch_handles()?;
                handles.bind_blas(stream)?;

                check_cublas(
                    cublas::$getri_batched(
                        handles.blas,
                        n,
                        a_array.addr() as *const *const _,
                        lda,
                        pivots.addr() as *const i32,
                        c_array.addr() as *const *mut _,
                        ldc,
                        infos.addr() as *mut i32,
                        batch_i32,
                    ),
                    stringify!($getri_batched),
                )?;
                log::debug!("{} launched for {} matrices", stringify!($getri_batched), batch);
                Ok(())
            }
        }
    };
}

impl_lu_kernels!(
    f32,
    cusolverDnSgetrf_bufferSize,
    cusolverDnSgetrf,
    cusolverDnSgetrs,
    cublasSgetrfBatched,
    cublasSgetriBatched
);

impl_lu_kernels!(
    f64,
    cusolverDnDgetrf_bufferSize,
    cusolverDnDgetrf,
    cusolverDnDgetrs,
    cublasDgetrfBatched,
    cublasDgetriBatched
);

impl_lu_kernels!(
    C32,
    cusolverDnCgetrf_bufferSize,
    cusolverDnCgetrf,
    cusolverDnCgetrs,
    cublasCgetrfBatched,
    cublasCgetriBatched
);

impl_lu_kernels!(
    C64,
    cusolverDnZgetrf_bufferSize,
    cusolverDnZgetrf,
    cusolverDnZgetrs,
    cublasZgetrfBatched,
    cublasZgetriBatched
);
