//! Benchmark comparing the parallel-stream and fused strategies on the host.

use batchinv_backend_cpu::HostDevice;
use batchinv_core::MatrixBatch;
use batchinv_solver::{BatchedInverse, InverseConfig};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

/// Tridiagonal, diagonally dominant matrices (row-major).
fn tridiagonal_batch(batch_size: usize, n: usize) -> MatrixBatch<f64> {
    let mut data = vec![0.0; batch_size * n * n];
    for b in 0..batch_size {
        let m = &mut data[b * n * n..(b + 1) * n * n];
        for i in 0..n {
            m[i * n + i] = 4.0 + (b % 7) as f64 * 0.1;
            if i + 1 < n {
                m[i * n + i + 1] = -1.0;
                m[(i + 1) * n + i] = -1.0;
            }
        }
    }
    MatrixBatch::from_vec(&[batch_size, n, n], data).unwrap()
}

fn bench_strategies(c: &mut Criterion) {
    let device = Arc::new(HostDevice::new());
    let mut group = c.benchmark_group("batched_inverse");
    group.sample_size(20);

    for (batch_size, n) in [(4, 64), (64, 8), (256, 16), (16, 128)] {
        let input = tridiagonal_batch(batch_size, n);
        let param = format!("{}x{}x{}", batch_size, n, n);

        for (label, config) in [
            ("parallel_streams", InverseConfig::parallel_streams()),
            ("fused_batched", InverseConfig::fused_batched()),
            ("auto", InverseConfig::default()),
        ] {
            let engine = BatchedInverse::with_config(Arc::clone(&device), config);
            group.bench_with_input(BenchmarkId::new(label, &param), &input, |b, input| {
                b.iter(|| black_box(engine.invert_host(input).unwrap()))
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_strategies);
criterion_main!(benches);
