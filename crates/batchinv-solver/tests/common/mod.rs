//! Matrix generators shared by the integration tests.

#![allow(dead_code)]

use batchinv_core::MatrixBatch;
use proptest::prelude::*;
use proptest::strategy::ValueTree;
use proptest::test_runner::{Config, RngAlgorithm, TestRng, TestRunner};

/// `count` diagonally dominant (hence well-conditioned) `n × n` matrices,
/// row-major.
pub fn dominant_matrices(count: usize, n: usize) -> impl Strategy<Value = MatrixBatch<f64>> {
    prop::collection::vec(-1.0f64..1.0, count * n * n).prop_map(move |mut data| {
        for b in 0..count {
            for i in 0..n {
                data[b * n * n + i * n + i] += 2.0 * n as f64;
            }
        }
        MatrixBatch::from_vec(&[count, n, n], data).unwrap()
    })
}

/// A fixed draw from [`dominant_matrices`], reproducible per seed.
pub fn sample_dominant(count: usize, n: usize, seed: u8) -> MatrixBatch<f64> {
    let rng = TestRng::from_seed(RngAlgorithm::ChaCha, &[seed; 32]);
    let mut runner = TestRunner::new_with_rng(Config::default(), rng);
    dominant_matrices(count, n)
        .new_tree(&mut runner)
        .unwrap()
        .current()
}
