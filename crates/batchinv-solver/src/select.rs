//! Strategy selection for batched inversion.
//!
//! The fused batched kernels amortize launch overhead across many small
//! matrices but scale poorly with matrix size, while one launch per matrix on
//! parallel streams wins when the batch is small or each matrix is large
//! enough to keep the device busy on its own.

use std::fmt;

/// Batches up to this size are launched per matrix.
pub const LOOPED_BATCH_LIMIT: usize = 8;

/// Matrices at least this large are launched per matrix.
pub const LOOPED_MATRIX_THRESHOLD: usize = 512;

/// Maximum number of streams used by the parallel-stream strategy.
pub const STREAM_POOL_SIZE: usize = 32;

/// How a multi-matrix batch is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum InversionStrategy {
    /// Choose from batch and matrix size (default).
    #[default]
    Auto,
    /// One factorize + solve per matrix, spread over a stream pool.
    ParallelStreams,
    /// One batched factorize and one batched invert for the whole batch.
    FusedBatched,
}

impl InversionStrategy {
    /// Parse from string (for CLI).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "parallel" | "streams" | "loop" => Some(Self::ParallelStreams),
            "fused" | "batched" => Some(Self::FusedBatched),
            _ => None,
        }
    }

    /// Get the strategy name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::ParallelStreams => "parallel streams",
            Self::FusedBatched => "fused batched",
        }
    }
}

impl fmt::Display for InversionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Configuration for batched inversion.
#[derive(Debug, Clone)]
pub struct InverseConfig {
    /// Strategy selection mode.
    pub strategy: InversionStrategy,
    /// In auto mode, batches of at most this many matrices use parallel streams.
    pub looped_batch_limit: usize,
    /// In auto mode, matrices with `n` at least this value use parallel streams.
    pub looped_matrix_threshold: usize,
    /// Upper bound on streams created by the parallel-stream strategy.
    pub stream_pool_size: usize,
}

impl Default for InverseConfig {
    fn default() -> Self {
        Self {
            strategy: InversionStrategy::Auto,
            looped_batch_limit: LOOPED_BATCH_LIMIT,
            looped_matrix_threshold: LOOPED_MATRIX_THRESHOLD,
            stream_pool_size: STREAM_POOL_SIZE,
        }
    }
}

impl InverseConfig {
    /// Create a config that always uses parallel streams.
    pub fn parallel_streams() -> Self {
        Self {
            strategy: InversionStrategy::ParallelStreams,
            ..Default::default()
        }
    }

    /// Create a config that always uses the fused batched kernels.
    pub fn fused_batched() -> Self {
        Self {
            strategy: InversionStrategy::FusedBatched,
            ..Default::default()
        }
    }

    /// Create an auto config with custom crossover thresholds.
    pub fn with_thresholds(looped_batch_limit: usize, looped_matrix_threshold: usize) -> Self {
        Self {
            looped_batch_limit,
            looped_matrix_threshold,
            ..Default::default()
        }
    }

    /// Set the stream pool size (at least one stream is always used).
    pub fn with_stream_pool_size(mut self, size: usize) -> Self {
        self.stream_pool_size = size.max(1);
        self
    }

    /// Set the strategy selection mode.
    pub fn with_strategy(mut self, strategy: InversionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Cost heuristic: whether per-matrix launches beat one fused call.
    ///
    /// Monotone: for fixed `n` the answer only turns from `true` to `false`
    /// as `batch_size` grows, and for fixed `batch_size` only from `false`
    /// to `true` as `n` grows.
    pub fn prefers_parallel_streams(&self, batch_size: usize, n: usize) -> bool {
        batch_size <= self.looped_batch_limit || n >= self.looped_matrix_threshold
    }

    /// Concrete strategy for a workload; never returns `Auto`.
    pub fn resolve(&self, batch_size: usize, n: usize) -> InversionStrategy {
        match self.strategy {
            InversionStrategy::Auto if self.prefers_parallel_streams(batch_size, n) => {
                InversionStrategy::ParallelStreams
            }
            InversionStrategy::Auto => InversionStrategy::FusedBatched,
            forced => forced,
        }
    }
}
