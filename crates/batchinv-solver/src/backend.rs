//! Compute backend selection.
//!
//! Provides [`ComputeBackend`] for choosing between the host and CUDA devices
//! at runtime. The enum lives in `batchinv-solver` so every crate can name a
//! backend without depending on the adapters; probing for an actual device is
//! done by the application layer.

use std::fmt;

/// The device that runs the LU kernels.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ComputeBackend {
    /// Host memory and rayon-driven streams (always available).
    #[default]
    Cpu,
    /// NVIDIA CUDA device (cuSOLVER + cuBLAS).
    Cuda {
        /// CUDA device ordinal.
        device_id: usize,
    },
}

impl ComputeBackend {
    /// Parse a backend name from a CLI argument string.
    ///
    /// Accepts `"auto"`, `"cpu"` or `"cuda"`. For `"auto"`, returns `Cpu`;
    /// the caller probes for a GPU separately and upgrades the result.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "auto" | "cpu" => Some(ComputeBackend::Cpu),
            "cuda" => Some(ComputeBackend::Cuda { device_id: 0 }),
            _ => None,
        }
    }

    /// Short name for display.
    pub fn name(&self) -> &str {
        match self {
            ComputeBackend::Cpu => "CPU",
            ComputeBackend::Cuda { .. } => "CUDA",
        }
    }
}

impl fmt::Display for ComputeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeBackend::Cpu => write!(f, "CPU"),
            ComputeBackend::Cuda { device_id } => write!(f, "CUDA (device {})", device_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_cpu() {
        assert_eq!(ComputeBackend::default(), ComputeBackend::Cpu);
    }

    #[test]
    fn from_name_auto() {
        assert_eq!(ComputeBackend::from_name("auto"), Some(ComputeBackend::Cpu));
    }

    #[test]
    fn from_name_case_insensitive() {
        assert_eq!(
            ComputeBackend::from_name("CUDA"),
            Some(ComputeBackend::Cuda { device_id: 0 })
        );
    }

    #[test]
    fn from_name_invalid() {
        assert!(ComputeBackend::from_name("metal").is_none());
    }

    #[test]
    fn display_cuda() {
        let b = ComputeBackend::Cuda { device_id: 1 };
        assert_eq!(format!("{}", b), "CUDA (device 1)");
        assert_eq!(b.name(), "CUDA");
    }
}
