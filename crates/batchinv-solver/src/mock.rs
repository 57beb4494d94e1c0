//! Recording device for orchestration tests.
//!
//! Memory is a set of byte regions at synthetic addresses. Kernels do no
//! arithmetic: they log the call, scribble over factorized matrices and write
//! programmed info codes, so tests can check dispatch, addressing and audit
//! behaviour independently of any numerical backend.

use crate::device::{Device, DeviceBuffer, DevicePtr, LuKernels};
use crate::error::{Error, Result};
use batchinv_core::DeviceScalar;
use std::marker::PhantomData;
use std::sync::Mutex;

const ALIGN: u64 = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Factorize { stream: usize, a: u64 },
    Solve { stream: usize, b: u64 },
    BatchedFactorize { stream: usize, matrices: Vec<u64> },
    BatchedInvert { stream: usize, outputs: Vec<u64> },
    Join { streams: Vec<usize> },
}

struct Region {
    base: u64,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct State {
    regions: Vec<Region>,
    next_addr: u64,
    next_stream: usize,
    calls: Vec<Call>,
    factorized: usize,
}

/// Synthetic device; see module docs.
#[derive(Default)]
pub(crate) struct MockDevice {
    state: Mutex<State>,
    /// Info code for the i-th factorized matrix (missing entries are 0).
    factor_codes: Vec<i32>,
    default_stream: MockStream,
}

#[derive(Debug, Default)]
pub(crate) struct MockStream(usize);

pub(crate) struct MockBuffer<S> {
    base: u64,
    len: usize,
    _marker: PhantomData<fn() -> S>,
}

impl<S: DeviceScalar> DeviceBuffer<S> for MockBuffer<S> {
    fn len(&self) -> usize {
        self.len
    }

    fn device_ptr(&self) -> DevicePtr<S> {
        DevicePtr::new(self.base)
    }
}

impl MockDevice {
    pub(crate) fn with_factor_codes(codes: Vec<i32>) -> Self {
        Self {
            factor_codes: codes,
            ..Default::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    fn allocate(&self, bytes: Vec<u8>) -> u64 {
        let mut state = self.state.lock().unwrap();
        let base = state.next_addr.max(ALIGN);
        let size = (bytes.len() as u64).max(1);
        state.next_addr = base + size.div_ceil(ALIGN) * ALIGN;
        state.regions.push(Region { base, bytes });
        base
    }

    fn with_bytes<R>(&self, addr: u64, len: usize, f: impl FnOnce(&mut [u8]) -> R) -> Result<R> {
        let mut state = self.state.lock().unwrap();
        let region = state
            .regions
            .iter_mut()
            .find(|r| addr >= r.base && addr + len as u64 <= r.base + r.bytes.len() as u64)
            .ok_or_else(|| Error::Backend(format!("unmapped address {:#x}", addr)))?;
        let start = (addr - region.base) as usize;
        Ok(f(&mut region.bytes[start..start + len]))
    }

    fn write<S: DeviceScalar>(&self, ptr: DevicePtr<S>, value: S) -> Result<()> {
        let size = std::mem::size_of::<S>();
        self.with_bytes(ptr.addr(), size, |bytes| {
            bytes.copy_from_slice(bytemuck::bytes_of(&value))
        })
    }

    fn read_pointers(&self, array: DevicePtr<u64>, count: usize) -> Result<Vec<u64>> {
        self.with_bytes(array.addr(), count * 8, |bytes| {
            bytemuck::pod_collect_to_vec::<u8, u64>(bytes)
        })
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn next_factor_code(&self) -> i32 {
        let mut state = self.state.lock().unwrap();
        let code = self.factor_codes.get(state.factorized).copied().unwrap_or(0);
        state.factorized += 1;
        code
    }
}

impl Device for MockDevice {
    type Buffer<S: DeviceScalar> = MockBuffer<S>;
    type Stream = MockStream;

    fn name(&self) -> &str {
        "mock"
    }

    fn default_stream(&self) -> &MockStream {
        &self.default_stream
    }

    fn create_streams(&self, count: usize) -> Result<Vec<MockStream>> {
        let mut state = self.state.lock().unwrap();
        let first = state.next_stream + 1;
        state.next_stream += count;
        Ok((first..first + count).map(MockStream).collect())
    }

    fn join(&self, streams: &[MockStream]) -> Result<()> {
        self.record(Call::Join {
            streams: streams.iter().map(|s| s.0).collect(),
        });
        Ok(())
    }

    fn synchronize(&self, _stream: &MockStream) -> Result<()> {
        Ok(())
    }

    fn alloc_zeros<S: DeviceScalar>(&self, len: usize) -> Result<MockBuffer<S>> {
        let base = self.allocate(vec![0; len * std::mem::size_of::<S>()]);
        Ok(MockBuffer {
            base,
            len,
            _marker: PhantomData,
        })
    }

    fn upload<S: DeviceScalar>(&self, host: &[S]) -> Result<MockBuffer<S>> {
        let base = self.allocate(bytemuck::cast_slice(host).to_vec());
        Ok(MockBuffer {
            base,
            len: host.len(),
            _marker: PhantomData,
        })
    }

    fn download<S: DeviceScalar>(&self, buffer: &MockBuffer<S>) -> Result<Vec<S>> {
        let size = buffer.len * std::mem::size_of::<S>();
        self.with_bytes(buffer.base, size, |bytes| {
            bytemuck::pod_collect_to_vec::<u8, S>(bytes)
        })
    }

    fn duplicate<S: DeviceScalar>(&self, buffer: &MockBuffer<S>) -> Result<MockBuffer<S>> {
        let host = self.download(buffer)?;
        self.upload(&host)
    }
}

impl LuKernels<f64> for MockDevice {
    unsafe fn factorize(
        &self,
        stream: &MockStream,
        _n: usize,
        a: DevicePtr<f64>,
        _lda: usize,
        _pivots: DevicePtr<i32>,
        info: DevicePtr<i32>,
    ) -> Result<()> {
        self.record(Call::Factorize {
            stream: stream.0,
            a: a.addr(),
        });
        self.write(a, f64::NAN)?;
        self.write(info, self.next_factor_code())
    }

    unsafe fn solve(
        &self,
        stream: &MockStream,
        _n: usize,
        _nrhs: usize,
        _a: DevicePtr<f64>,
        _lda: usize,
        _pivots: DevicePtr<i32>,
        b: DevicePtr<f64>,
        _ldb: usize,
        _info: DevicePtr<i32>,
    ) -> Result<()> {
        self.record(Call::Solve {
            stream: stream.0,
            b: b.addr(),
        });
        Ok(())
    }

    unsafe fn batched_factorize(
        &self,
        stream: &MockStream,
        _n: usize,
        a_array: DevicePtr<u64>,
        _lda: usize,
        _pivots: DevicePtr<i32>,
        infos: DevicePtr<i32>,
        batch: usize,
    ) -> Result<()> {
        let matrices = self.read_pointers(a_array, batch)?;
        for (i, &addr) in matrices.iter().enumerate() {
            self.write(DevicePtr::<f64>::new(addr), f64::NAN)?;
            self.write(infos.add(i), self.next_factor_code())?;
        }
        self.record(Call::BatchedFactorize {
            stream: stream.0,
            matrices,
        });
        Ok(())
    }

    unsafe fn batched_invert(
        &self,
        stream: &MockStream,
        _n: usize,
        _a_array: DevicePtr<u64>,
        _lda: usize,
        _pivots: DevicePtr<i32>,
        c_array: DevicePtr<u64>,
        _ldc: usize,
        _infos: DevicePtr<i32>,
        batch: usize,
    ) -> Result<()> {
        let outputs = self.read_pointers(c_array, batch)?;
        self.record(Call::BatchedInvert {
            stream: stream.0,
            outputs,
        });
        Ok(())
    }
}
