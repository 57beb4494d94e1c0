//! Backend-agnostic batched matrix inversion for batchinv.
//!
//! This crate provides:
//! - The device seam: [`Device`], [`DeviceBuffer`], [`DevicePtr`] and the
//!   [`LuKernels`] capability trait implemented by backend adapters
//! - [`DeviceBatch`], a column-major matrix batch in device memory
//! - Device pointer arrays for batched kernels ([`DevicePointerArray`])
//! - The strategy selector ([`InverseConfig`], [`InversionStrategy`])
//! - Parallel-stream and fused-batched execution strategies
//! - [`BatchedInverse`], which orchestrates and audits a whole call

pub mod backend;
pub mod batch;
pub mod device;
pub mod error;
pub mod inverse;
pub mod pointer_array;
pub mod select;
pub mod status;
pub mod strategy;

#[cfg(test)]
mod mock;

pub use backend::ComputeBackend;
pub use batch::DeviceBatch;
pub use device::{Device, DeviceBuffer, DevicePtr, LuKernels};
pub use error::{Error, Result};
pub use inverse::{BatchedInverse, inverse_host};
pub use pointer_array::{DevicePointerArray, DevicePointerBuffer};
pub use select::{
    InverseConfig, InversionStrategy, LOOPED_BATCH_LIMIT, LOOPED_MATRIX_THRESHOLD,
    STREAM_POOL_SIZE,
};
pub use status::{Phase, StatusFailure, StatusPairs};
pub use strategy::{run_fused_batched, run_parallel_streams, solve_unit};
