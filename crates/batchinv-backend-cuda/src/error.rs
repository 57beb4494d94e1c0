//! Error types for CUDA backend operations.

use std::fmt;

/// CUDA backend error type.
#[derive(Debug)]
pub enum CudaError {
    /// CUDA device initialization failed.
    DeviceInit(String),
    /// CUDA memory allocation failed.
    MemoryAlloc(String),
    /// Data transfer error (host<->device).
    Transfer(String),
    /// Stream creation or synchronization failed.
    Stream(String),
    /// cuBLAS call rejected.
    Cublas(String),
    /// cuSOLVER call rejected.
    Cusolver(String),
    /// Dimension does not fit the vendor API's integer type.
    InvalidDimension(String),
    /// No CUDA device available.
    NoDevice,
}

impl fmt::Display for CudaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CudaError::DeviceInit(msg) => write!(f, "CUDA device initialization failed: {}", msg),
            CudaError::MemoryAlloc(msg) => write!(f, "CUDA memory allocation failed: {}", msg),
            CudaError::Transfer(msg) => write!(f, "CUDA data transfer failed: {}", msg),
            CudaError::Stream(msg) => write!(f, "CUDA stream operation failed: {}", msg),
            CudaError::Cublas(msg) => write!(f, "cuBLAS operation failed: {}", msg),
            CudaError::Cusolver(msg) => write!(f, "cuSOLVER operation failed: {}", msg),
            CudaError::InvalidDimension(msg) => write!(f, "Invalid dimension: {}", msg),
            CudaError::NoDevice => write!(f, "No CUDA device available"),
        }
    }
}

impl std::error::Error for CudaError {}

impl From<CudaError> for batchinv_solver::Error {
    fn from(e: CudaError) -> Self {
        batchinv_solver::Error::Backend(e.to_string())
    }
}

/// Result type for CUDA operations.
pub type Result<T> = std::result::Result<T, CudaError>;

/// Convert a size to the `i32` the vendor APIs take.
pub(crate) fn to_i32(value: usize, what: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| CudaError::InvalidDimension(format!("{} = {} exceeds i32::MAX", what, value)))
}
