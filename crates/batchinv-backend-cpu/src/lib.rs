//! Host backend for batchinv.
//!
//! [`HostDevice`] implements the device seam on ordinary memory: buffers
//! have real addresses, streams are deferred work queues drained on the rayon
//! pool, and the LU primitives run the unblocked kernels in [`lu`] for every
//! element kind.

pub mod buffer;
pub mod device;
pub mod lu;
pub mod stream;

pub use buffer::HostBuffer;
pub use device::HostDevice;
pub use stream::HostStream;
