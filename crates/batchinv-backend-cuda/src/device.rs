//! CUDA implementation of the device seam.

use crate::error::{CudaError, Result};
use crate::handles::Handles;
use batchinv_core::DeviceScalar;
use batchinv_solver::{Device, DeviceBuffer, DevicePtr};
use cudarc::driver::DevicePtr as _;
use cudarc::driver::{CudaContext, CudaSlice, CudaStream};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Device allocation holding `len` elements of `S`.
///
/// Storage is untyped bytes so any [`DeviceScalar`], complex types included,
/// can live on the device.
pub struct CudaBuffer<S> {
    bytes: CudaSlice<u8>,
    len: usize,
    stream: Arc<CudaStream>,
    _marker: PhantomData<fn() -> S>,
}

impl<S: DeviceScalar> DeviceBuffer<S> for CudaBuffer<S> {
    fn len(&self) -> usize {
        self.len
    }

    fn device_ptr(&self) -> DevicePtr<S> {
        let (ptr, _guard) = self.bytes.device_ptr(&self.stream);
        DevicePtr::new(ptr)
    }
}

/// A CUDA device with cuBLAS and cuSOLVER handles.
///
/// Create one and share it (it is `Send + Sync`) to avoid reinitialization.
pub struct CudaDevice {
    ctx: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    handles: Mutex<Handles>,
    ordinal: usize,
}

impl CudaDevice {
    /// Open device 0.
    ///
    /// # Errors
    ///
    /// Returns `CudaError::NoDevice` if no CUDA device is available.
    /// Returns `CudaError::DeviceInit` if device or library initialization fails.
    pub fn new() -> Result<Self> {
        Self::with_device(0)
    }

    /// Open a specific device.
    pub fn with_device(ordinal: usize) -> Result<Self> {
        let ctx = CudaContext::new(ordinal).map_err(|e| {
            let msg = e.to_string();
            if msg.contains("no CUDA-capable device")
                || msg.contains("invalid device")
                || msg.contains("ordinal")
            {
                CudaError::NoDevice
            } else {
                CudaError::DeviceInit(msg)
            }
        })?;

        // SAFETY: cross-stream ordering is established by `join`/`synchronize`
        // and by transfers on the default stream.
        unsafe { ctx.disable_event_tracking() };

        let stream = ctx.default_stream();
        let handles = Handles::new()?;

        log::info!("CUDA device {} initialized", ordinal);

        Ok(Self {
            ctx,
            stream,
            handles: Mutex::new(handles),
            ordinal,
        })
    }

    /// Check if CUDA is available on this system.
    pub fn is_available() -> bool {
        CudaContext::new(0).is_ok()
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn cuda_context(&self) -> &Arc<CudaContext> {
        &self.ctx
    }

    /// Make the context current and take the library handles.
    pub(crate) fn launch_handles(&self) -> Result<MutexGuard<'_, Handles>> {
        self.ctx
            .bind_to_thread()
            .map_err(|e| CudaError::DeviceInit(format!("context bind failed: {}", e)))?;
        Ok(self.handles.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn wrap<S>(&self, bytes: CudaSlice<u8>, len: usize) -> CudaBuffer<S> {
        CudaBuffer {
            bytes,
            len,
            stream: Arc::clone(&self.stream),
            _marker: PhantomData,
        }
    }
}

impl Device for CudaDevice {
    type Buffer<S: DeviceScalar> = CudaBuffer<S>;
    type Stream = Arc<CudaStream>;

    fn name(&self) -> &str {
        "cuda"
    }

    fn default_stream(&self) -> &Arc<CudaStream> {
        &self.stream
    }

    fn create_streams(&self, count: usize) -> batchinv_solver::Result<Vec<Arc<CudaStream>>> {
        let streams = (0..count)
            .map(|_| {
                self.stream
                    .fork()
                    .map_err(|e| CudaError::Stream(format!("stream creation failed: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(streams)
    }

    fn join(&self, streams: &[Arc<CudaStream>]) -> batchinv_solver::Result<()> {
        for stream in streams {
            self.synchronize(stream)?;
        }
        Ok(())
    }

    fn synchronize(&self, stream: &Arc<CudaStream>) -> batchinv_solver::Result<()> {
        stream
            .synchronize()
            .map_err(|e| CudaError::Stream(format!("synchronize failed: {}", e)))?;
        Ok(())
    }

    fn alloc_zeros<S: DeviceScalar>(&self, len: usize) -> batchinv_solver::Result<CudaBuffer<S>> {
        // Zero-length requests still get one byte so every buffer has an address.
        let size = (len * std::mem::size_of::<S>()).max(1);
        let bytes = self
            .stream
            .alloc_zeros::<u8>(size)
            .map_err(|e| CudaError::MemoryAlloc(format!("{} bytes: {}", size, e)))?;
        Ok(self.wrap(bytes, len))
    }

    fn upload<S: DeviceScalar>(&self, host: &[S]) -> batchinv_solver::Result<CudaBuffer<S>> {
        if host.is_empty() {
            return self.alloc_zeros(0);
        }
        let bytes = self
            .stream
            .memcpy_stod(bytemuck::cast_slice::<S, u8>(host))
            .map_err(|e| CudaError::Transfer(format!("upload failed: {}", e)))?;
        log::debug!(
            "Uploaded {} elements ({} bytes) to device {}",
            host.len(),
            std::mem::size_of_val(host),
            self.ordinal
        );
        Ok(self.wrap(bytes, host.len()))
    }

    fn download<S: DeviceScalar>(&self, buffer: &CudaBuffer<S>) -> batchinv_solver::Result<Vec<S>> {
        let mut bytes = self
            .stream
            .memcpy_dtov(&buffer.bytes)
            .map_err(|e| CudaError::Transfer(format!("download failed: {}", e)))?;
        bytes.truncate(buffer.len * std::mem::size_of::<S>());
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    fn duplicate<S: DeviceScalar>(&self, buffer: &CudaBuffer<S>) -> batchinv_solver::Result<CudaBuffer<S>> {
        let bytes = self
            .stream
            .clone_dtod(&buffer.bytes)
            .map_err(|e| CudaError::Transfer(format!("device copy failed: {}", e)))?;
        Ok(self.wrap(bytes, buffer.len))
    }
}
