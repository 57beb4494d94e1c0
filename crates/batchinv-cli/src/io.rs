//! JSON matrix batch files.
//!
//! A file holds the full shape and the values in row-major order:
//!
//! ```json
//! { "shape": [2, 2, 2], "data": [2.0, 0.0, 0.0, 2.0, 4.0, 0.0, 0.0, 4.0] }
//! ```

use anyhow::{Context, Result};
use batchinv_core::{Element, MatrixBatch};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixFile {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl MatrixFile {
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read matrix file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid matrix file: {}", path.display()))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of matrices and their size, for display.
    pub fn describe(&self) -> String {
        match self.shape.len() {
            0 | 1 => format!("shape {:?}", self.shape),
            nd => {
                let batch: usize = self.shape[..nd - 2].iter().product();
                format!(
                    "{} matrices of {}x{}",
                    batch,
                    self.shape[nd - 2],
                    self.shape[nd - 1]
                )
            }
        }
    }

    pub fn to_batch<T: Element>(&self) -> Result<MatrixBatch<T>> {
        let data = self.data.iter().map(|&v| T::from_f64(v)).collect();
        MatrixBatch::from_vec(&self.shape, data).context("Matrix file does not match its shape")
    }

    pub fn from_batch<T: Element + ToPrimitive>(batch: &MatrixBatch<T>) -> Self {
        Self {
            shape: batch.shape().to_vec(),
            data: batch
                .to_row_major_vec()
                .into_iter()
                .map(|v| v.to_f64().unwrap_or(f64::NAN))
                .collect(),
        }
    }
}
