//! CUDA backend for batchinv.
//!
//! [`CudaDevice`] implements the device seam on a CUDA context: buffers are
//! device allocations, streams are CUDA streams forked from the default
//! stream, and the LU primitives call cuSOLVER (`getrf`/`getrs`) and cuBLAS
//! (`getrfBatched`/`getriBatched`) for `f32` and `f64`.

pub mod device;
pub mod error;
mod handles;
mod kernels;

pub use device::{CudaBuffer, CudaDevice};
pub use error::{CudaError, Result};
