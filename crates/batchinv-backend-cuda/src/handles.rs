//! cuBLAS and cuSOLVER dense handle management.
//!
//! One handle of each library serves every stream: a launch binds the handle
//! to its stream right before the call, under the lock in `CudaDevice`.

use crate::error::{CudaError, Result};
use cudarc::cublas::sys as cublas;
use cudarc::cusolver::sys as cusolver;
use cudarc::driver::CudaStream;
use std::mem::MaybeUninit;

pub(crate) struct Handles {
    pub(crate) blas: cublas::cublasHandle_t,
    pub(crate) solver: cusolver::cusolverDnHandle_t,
}

// SAFETY: the handles are only used while holding the mutex that owns this
// struct, so they are never touched from two threads at once.
unsafe impl Send for Handles {}

impl Handles {
    pub(crate) fn new() -> Result<Self> {
        let blas = create_cublas_handle()
            .map_err(|e| CudaError::DeviceInit(format!("cuBLAS init failed: {}", e)))?;
        let solver = match create_cusolver_dn_handle() {
            Ok(handle) => handle,
            Err(e) => {
                unsafe {
                    let _ = cublas::cublasDestroy_v2(blas);
                }
                return Err(CudaError::DeviceInit(format!("cuSOLVER init failed: {}", e)));
            }
        };
        Ok(Self { blas, solver })
    }

    /// Route subsequent cuBLAS calls to `stream`.
    pub(crate) fn bind_blas(&self, stream: &CudaStream) -> Result<()> {
        let status = unsafe { cublas::cublasSetStream_v2(self.blas, stream.cu_stream() as _) };
        if status != cublas::cublasStatus_t::CUBLAS_STATUS_SUCCESS {
            return Err(CudaError::Cublas(format!("cublasSetStream failed: {:?}", status)));
        }
        Ok(())
    }

    /// Route subsequent cuSOLVER calls to `stream`.
    pub(crate) fn bind_solver(&self, stream: &CudaStream) -> Result<()> {
        let status = unsafe { cusolver::cusolverDnSetStream(self.solver, stream.cu_stream() as _) };
        if status != cusolver::cusolverStatus_t::CUSOLVER_STATUS_SUCCESS {
            return Err(CudaError::Cusolver(format!(
                "cusolverDnSetStream failed: {:?}",
                status
            )));
        }
        Ok(())
    }
}

impl Drop for Handles {
    fn drop(&mut self) {
        unsafe {
            let _ = cusolver::cusolverDnDestroy(self.solver);
        }
        unsafe {
            let _ = cublas::cublasDestroy_v2(self.blas);
        }
    }
}

fn create_cublas_handle() -> std::result::Result<cublas::cublasHandle_t, String> {
    let mut handle = MaybeUninit::uninit();
    let status = unsafe { cublas::cublasCreate_v2(handle.as_mut_ptr()) };
    if status != cublas::cublasStatus_t::CUBLAS_STATUS_SUCCESS {
        return Err(format!("cublasCreate failed: {:?}", status));
    }
    Ok(unsafe { handle.assume_init() })
}

fn create_cusolver_dn_handle() -> std::result::Result<cusolver::cusolverDnHandle_t, String> {
    let mut handle = MaybeUninit::uninit();
    let status = unsafe { cusolver::cusolverDnCreate(handle.as_mut_ptr()) };
    if status != cusolver::cusolverStatus_t::CUSOLVER_STATUS_SUCCESS {
        return Err(format!("cusolverDnCreate failed: {:?}", status));
    }
    Ok(unsafe { handle.assume_init() })
}
