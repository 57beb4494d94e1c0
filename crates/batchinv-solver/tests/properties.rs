//! Property tests for inversion on the host backend.

mod common;

use batchinv_backend_cpu::HostDevice;
use batchinv_core::MatrixBatch;
use batchinv_solver::{BatchedInverse, Error, InverseConfig};
use common::dominant_matrices;
use proptest::prelude::*;
use std::sync::Arc;

/// Batches of one to five diagonally dominant matrices of size one to five.
fn dominant_batch() -> impl Strategy<Value = MatrixBatch<f64>> {
    (1usize..6, 1usize..6).prop_flat_map(|(count, n)| dominant_matrices(count, n))
}

fn configs() -> impl Strategy<Value = InverseConfig> {
    prop_oneof![
        Just(InverseConfig::default()),
        Just(InverseConfig::parallel_streams()),
        Just(InverseConfig::fused_batched()),
        (1usize..4).prop_map(|pool| InverseConfig::parallel_streams().with_stream_pool_size(pool)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_double_inverse_roundtrips(input in dominant_batch(), config in configs()) {
        let engine = BatchedInverse::with_config(Arc::new(HostDevice::new()), config);
        let once = engine.invert_host(&input).unwrap();
        let twice = engine.invert_host(&once).unwrap();
        for (a, b) in input.to_row_major_vec().iter().zip(twice.to_row_major_vec()) {
            prop_assert!((a - b).abs() < 1e-10, "{} vs {}", a, b);
        }
    }

    #[test]
    fn prop_product_is_identity(input in dominant_batch(), config in configs()) {
        let engine = BatchedInverse::with_config(Arc::new(HostDevice::new()), config);
        let inverse = engine.invert_host(&input).unwrap();
        let n = input.shape()[2];
        for b in 0..input.batch_size() {
            let a = input.matrix_rows(b);
            let inv = inverse.matrix_rows(b);
            for r in 0..n {
                for c in 0..n {
                    let value: f64 = (0..n).map(|k| a[r * n + k] * inv[k * n + c]).sum();
                    let expected = if r == c { 1.0 } else { 0.0 };
                    prop_assert!((value - expected).abs() < 1e-10,
                        "matrix {} ({}, {}) = {}", b, r, c, value);
                }
            }
        }
    }

    #[test]
    fn prop_zero_matrix_is_reported(
        input in dominant_batch(),
        position in any::<prop::sample::Index>(),
        config in configs(),
    ) {
        let count = input.batch_size();
        let n = input.shape()[2];
        let zeroed = position.index(count);
        let mut data = input.into_data();
        for v in &mut data[zeroed * n * n..(zeroed + 1) * n * n] {
            *v = 0.0;
        }
        let input = MatrixBatch::from_vec(&[count, n, n], data).unwrap();

        let engine = BatchedInverse::with_config(Arc::new(HostDevice::new()), config);
        match engine.invert_host(&input) {
            Err(Error::Singular { matrix, code, .. }) => {
                prop_assert_eq!(matrix, zeroed);
                prop_assert_eq!(code, 1);
            }
            other => prop_assert!(false, "expected a singular error, got {:?}", other.map(|_| ())),
        }
    }
}
