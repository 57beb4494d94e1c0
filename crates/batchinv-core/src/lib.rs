//! Element kinds and strided matrix-batch containers for batchinv.
//!
//! This crate provides the data structures shared by the inversion engine
//! and its backends:
//! - [`Element`] and [`ElementKind`], the closed set of supported scalars
//! - [`MatrixBatch`], a host-side strided N-dimensional batch of matrices
//! - [`identity_like`], the column-major identity factory

pub mod batch;
pub mod element;
pub mod error;
pub mod identity;

pub use batch::MatrixBatch;
pub use element::{C32, C64, DeviceScalar, Element, ElementKind};
pub use error::{Error, Result};
pub use identity::identity_like;
