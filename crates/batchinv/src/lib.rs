//! # batchinv
//!
//! Batched matrix inversion: given a stack of square matrices of shape
//! `[..., n, n]`, compute the inverse of every matrix in one call.
//!
//! batchinv provides:
//! - Strided host containers with batched column-major conversion
//! - A backend-agnostic engine that picks between per-matrix launches on a
//!   pool of parallel streams and one fused batched factorize/invert pair
//! - Status auditing: any singular matrix or rejected argument fails the call
//! - A host backend (always available) and a CUDA backend (`cuda` feature)
//!
//! ## Quick Start
//!
//! ```rust
//! use batchinv::prelude::*;
//! use std::sync::Arc;
//!
//! // Two 2×2 matrices, row-major: diag(2, 2) and diag(4, 4).
//! let input = MatrixBatch::from_vec(
//!     &[2, 2, 2],
//!     vec![2.0, 0.0, 0.0, 2.0, 4.0, 0.0, 0.0, 4.0],
//! )
//! .unwrap();
//!
//! let engine = BatchedInverse::new(Arc::new(HostDevice::new()));
//! let inverse = engine.invert_host(&input).unwrap();
//! assert_eq!(inverse.at(1, 0, 0), 0.25);
//! ```
//!
//! ## Features
//!
//! - `cuda` - Enable the CUDA backend (requires an NVIDIA GPU at runtime)
//! - `full` - Enable all optional features

// Re-export member crates
pub use batchinv_core as core;
pub use batchinv_solver as solver;

pub use batchinv_backend_cpu as backend_cpu;

#[cfg(feature = "cuda")]
pub use batchinv_backend_cuda as backend_cuda;

pub use batchinv_core::{
    C32, C64, DeviceScalar, Element, ElementKind,
    // Containers
    MatrixBatch,
    // Errors
    Error as LayoutError,
    identity_like,
};

pub use batchinv_solver::{
    BatchedInverse,
    // Backends
    ComputeBackend,
    Device,
    DeviceBatch,
    DeviceBuffer,
    DevicePointerArray,
    DevicePtr,
    // Errors
    Error,
    // Configuration
    InverseConfig,
    InversionStrategy,
    LOOPED_BATCH_LIMIT,
    LOOPED_MATRIX_THRESHOLD,
    LuKernels,
    Phase,
    Result,
    STREAM_POOL_SIZE,
    StatusPairs,
    inverse_host,
};

pub use batchinv_backend_cpu::HostDevice;

#[cfg(feature = "cuda")]
pub use batchinv_backend_cuda::{CudaDevice, CudaError};

/// Re-export of num_complex's Complex type.
pub use num_complex::Complex;

/// Prelude module containing commonly used types and traits.
///
/// ```rust
/// use batchinv::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        BatchedInverse, Device, DeviceBatch, Element, ElementKind, Error, HostDevice,
        InverseConfig, InversionStrategy, MatrixBatch, inverse_host,
    };

    #[cfg(feature = "cuda")]
    pub use crate::CudaDevice;

    pub use crate::{C32, C64, Complex};
}
