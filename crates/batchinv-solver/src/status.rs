//! Per-matrix status codes and the post-hoc error audit.

use crate::error::{Error, Result};
use std::fmt;

/// Backend routine that produced a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Single-matrix LU factorization.
    Factorize,
    /// Single-matrix triangular solve against the identity.
    Solve,
    /// Batched LU factorization.
    BatchedFactorize,
    /// Batched inversion from LU factors.
    BatchedInvert,
}

impl Phase {
    /// LAPACK-style routine name.
    pub fn routine(&self) -> &'static str {
        match self {
            Phase::Factorize => "getrf",
            Phase::Solve => "getrs",
            Phase::BatchedFactorize => "getrfBatched",
            Phase::BatchedInvert => "getriBatched",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.routine())
    }
}

/// Status codes for every matrix of one inversion call.
///
/// Stored interleaved: `[factor_0, solve_0, factor_1, solve_1, ...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPairs {
    codes: Vec<i32>,
    phases: [Phase; 2],
}

/// One non-zero status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFailure {
    pub matrix: usize,
    pub phase: Phase,
    pub code: i32,
}

impl StatusFailure {
    fn into_error(self) -> Error {
        if self.code > 0 {
            Error::Singular {
                matrix: self.matrix,
                phase: self.phase,
                code: self.code,
            }
        } else {
            Error::IllegalArgument {
                matrix: self.matrix,
                phase: self.phase,
                argument: -self.code,
            }
        }
    }
}

impl StatusPairs {
    /// Wrap an interleaved status array of length `2 * batch`.
    pub fn from_interleaved(codes: Vec<i32>, phases: [Phase; 2]) -> Result<Self> {
        if codes.len() % 2 != 0 {
            return Err(Error::InvalidArgument(format!(
                "status array length {} is not a whole number of pairs",
                codes.len()
            )));
        }
        Ok(Self { codes, phases })
    }

    /// Combine one status vector per phase into pairs.
    pub fn from_phases(first: &[i32], second: &[i32], phases: [Phase; 2]) -> Result<Self> {
        if first.len() != second.len() {
            return Err(Error::InvalidArgument(format!(
                "phase status lengths differ: {} vs {}",
                first.len(),
                second.len()
            )));
        }
        let codes = first
            .iter()
            .zip(second)
            .flat_map(|(&f, &s)| [f, s])
            .collect();
        Ok(Self { codes, phases })
    }

    /// Number of matrices covered.
    pub fn batch_size(&self) -> usize {
        self.codes.len() / 2
    }

    /// `(factorization, solve)` codes of one matrix.
    pub fn pair(&self, matrix: usize) -> (i32, i32) {
        (self.codes[2 * matrix], self.codes[2 * matrix + 1])
    }

    pub fn codes(&self) -> &[i32] {
        &self.codes
    }

    pub fn phases(&self) -> [Phase; 2] {
        self.phases
    }

    pub fn is_success(&self) -> bool {
        self.codes.iter().all(|&c| c == 0)
    }

    /// All non-zero codes in matrix order, factorization before solve.
    pub fn failures(&self) -> impl Iterator<Item = StatusFailure> + '_ {
        self.codes
            .chunks_exact(2)
            .enumerate()
            .flat_map(move |(matrix, pair)| {
                pair.iter()
                    .zip(self.phases)
                    .filter(|(code, _)| **code != 0)
                    .map(move |(&code, phase)| StatusFailure {
                        matrix,
                        phase,
                        code,
                    })
            })
    }

    /// Turn the first non-zero code into an error.
    ///
    /// The whole array is scanned so the number of failing matrices can be
    /// logged; the reported error is the lowest matrix index, factorization
    /// phase first.
    pub fn audit(&self) -> Result<()> {
        let Some(first) = self.failures().next() else {
            return Ok(());
        };

        let failing = self
            .codes
            .chunks_exact(2)
            .filter(|pair| pair.iter().any(|&c| c != 0))
            .count();
        log::warn!(
            "{} of {} matrices failed inversion (first: matrix {}, {} info {})",
            failing,
            self.batch_size(),
            first.matrix,
            first.phase,
            first.code
        );

        Err(first.into_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOOP: [Phase; 2] = [Phase::Factorize, Phase::Solve];

    #[test]
    fn test_all_zero_passes() {
        let statuses = StatusPairs::from_interleaved(vec![0; 8], LOOP).unwrap();
        assert_eq!(statuses.batch_size(), 4);
        assert!(statuses.is_success());
        assert!(statuses.audit().is_ok());
    }

    #[test]
    fn test_from_phases_interleaves() {
        let statuses = StatusPairs::from_phases(
            &[0, 2, 0],
            &[0, 0, 5],
            [Phase::BatchedFactorize, Phase::BatchedInvert],
        )
        .unwrap();
        assert_eq!(statuses.codes(), &[0, 0, 2, 0, 0, 5]);
        assert_eq!(statuses.pair(2), (0, 5));
    }

    #[test]
    fn test_audit_reports_first_singular() {
        let statuses = StatusPairs::from_interleaved(vec![0, 0, 0, 3, 2, 2], LOOP).unwrap();
        match statuses.audit() {
            Err(Error::Singular {
                matrix,
                phase,
                code,
            }) => {
                assert_eq!(matrix, 1);
                assert_eq!(phase, Phase::Solve);
                assert_eq!(code, 3);
            }
            other => panic!("expected singular error, got {:?}", other),
        }
    }

    #[test]
    fn test_audit_factorization_before_solve() {
        let statuses = StatusPairs::from_interleaved(vec![4, 4], LOOP).unwrap();
        let err = statuses.audit().unwrap_err();
        assert!(matches!(
            err,
            Error::Singular {
                phase: Phase::Factorize,
                code: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_negative_code_is_illegal_argument() {
        let statuses = StatusPairs::from_interleaved(vec![-4, 0], LOOP).unwrap();
        assert!(matches!(
            statuses.audit(),
            Err(Error::IllegalArgument {
                matrix: 0,
                argument: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_failures_lists_every_code() {
        let statuses = StatusPairs::from_interleaved(vec![1, 0, 0, 0, 2, 7], LOOP).unwrap();
        let failures: Vec<_> = statuses.failures().collect();
        assert_eq!(failures.len(), 3);
        assert_eq!(failures[2].matrix, 2);
        assert_eq!(failures[2].phase, Phase::Solve);
        assert_eq!(failures[2].code, 7);
    }

    #[test]
    fn test_malformed_status_arrays_are_rejected() {
        assert!(matches!(
            StatusPairs::from_interleaved(vec![0; 3], LOOP),
            Err(Error::InvalidArgument(_))
        ));
        let err = StatusPairs::from_phases(&[0, 0], &[0], LOOP).unwrap_err();
        assert!(err.to_string().contains("2 vs 1"), "{}", err);
    }

    #[test]
    fn test_error_message_names_routine() {
        let err = StatusPairs::from_interleaved(vec![0, 0, 2, 0], LOOP).unwrap()
            .audit()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("batch element 1"), "{}", msg);
        assert!(msg.contains("getrf"), "{}", msg);
    }
}
