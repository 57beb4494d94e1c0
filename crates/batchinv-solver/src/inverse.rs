//! Batched inverse orchestration.
//!
//! [`BatchedInverse::invert`] validates the input, builds the identity output,
//! runs either the single-matrix path or one of the batch strategies and
//! audits every collected status code before handing the result back. Any
//! non-zero code fails the whole call; there is no partial result.

use crate::batch::DeviceBatch;
use crate::device::{Device, DeviceBuffer, LuKernels};
use crate::error::Result;
use crate::select::{InverseConfig, InversionStrategy};
use crate::status::StatusPairs;
use crate::strategy::{LOOPED_PHASES, run_fused_batched, run_parallel_streams, solve_unit};
use batchinv_core::batch::square_size;
use batchinv_core::{Element, MatrixBatch};
use std::sync::Arc;

/// Batched matrix inversion engine bound to one device.
pub struct BatchedInverse<D: Device> {
    device: Arc<D>,
    config: InverseConfig,
}

impl<D: Device> BatchedInverse<D> {
    /// Create an engine with the default configuration.
    pub fn new(device: Arc<D>) -> Self {
        Self {
            device,
            config: InverseConfig::default(),
        }
    }

    /// Create with custom configuration.
    pub fn with_config(device: Arc<D>, config: InverseConfig) -> Self {
        Self { device, config }
    }

    pub fn config(&self) -> &InverseConfig {
        &self.config
    }

    pub fn device(&self) -> &Arc<D> {
        &self.device
    }

    /// Strategy `invert` would use for a batch of this shape.
    ///
    /// `None` means the single-matrix path, which needs no strategy.
    pub fn plan(&self, shape: &[usize]) -> Result<Option<InversionStrategy>> {
        let n = square_size(shape)?;
        let batch: usize = shape[..shape.len() - 2].iter().product();
        if shape.len() > 2 && batch > 1 {
            Ok(Some(self.config.resolve(batch, n)))
        } else {
            Ok(None)
        }
    }

    /// Invert every matrix of `input` into a new batch.
    ///
    /// `input` itself is left untouched: factorization runs on a device copy.
    pub fn invert<T>(&self, input: &DeviceBatch<D, T>) -> Result<DeviceBatch<D, T>>
    where
        D: LuKernels<T>,
        T: Element,
    {
        let device = &*self.device;
        let batch = input.batch_size();
        let n = input.matrix_size();

        let output = DeviceBatch::identity_like(device, input.shape())?;
        if batch == 0 || n == 0 {
            return Ok(output);
        }

        let work = input.duplicate(device)?;

        let statuses = match self.plan(input.shape())? {
            Some(InversionStrategy::FusedBatched) => {
                log::debug!("Inverting {} matrices with fused batched kernels", batch);
                run_fused_batched(device, &work, &output)?
            }
            Some(strategy) => {
                log::debug!("Inverting {} matrices with {}", batch, strategy);
                let status: D::Buffer<i32> = device.alloc_zeros(2 * batch)?;
                run_parallel_streams(device, &self.config, &work, &output, &status)?;
                StatusPairs::from_interleaved(device.download(&status)?, LOOPED_PHASES)?
            }
            None => self.invert_single(&work, &output)?,
        };

        statuses.audit()?;
        Ok(output)
    }

    /// Upload, invert and download a host batch.
    pub fn invert_host<T>(&self, input: &MatrixBatch<T>) -> Result<MatrixBatch<T>>
    where
        D: LuKernels<T>,
        T: Element,
    {
        let device = &*self.device;
        let uploaded = DeviceBatch::upload(device, input)?;
        self.invert(&uploaded)?.download(device)
    }

    fn invert_single<T>(
        &self,
        work: &DeviceBatch<D, T>,
        output: &DeviceBatch<D, T>,
    ) -> Result<StatusPairs>
    where
        D: LuKernels<T>,
        T: Element,
    {
        let device = &*self.device;
        let n = work.matrix_size();
        let pivots: D::Buffer<i32> = device.alloc_zeros(n)?;
        let status: D::Buffer<i32> = device.alloc_zeros(2)?;
        let stream = device.default_stream();

        // SAFETY: a single matrix; every buffer is owned by this frame and
        // outlives the synchronize below.
        let launched = unsafe {
            solve_unit(
                device,
                stream,
                n,
                work.matrix_ptr(0),
                output.matrix_ptr(0),
                pivots.device_ptr(),
                status.device_ptr(),
            )
        };
        let synced = device.synchronize(stream);
        launched?;
        synced?;

        StatusPairs::from_interleaved(device.download(&status)?, LOOPED_PHASES)
    }
}

/// Invert a host batch with the default configuration.
pub fn inverse_host<D, T>(device: Arc<D>, input: &MatrixBatch<T>) -> Result<MatrixBatch<T>>
where
    D: LuKernels<T>,
    T: Element,
{
    BatchedInverse::new(device).invert_host(input)
}
