//! Unblocked LU kernels on column-major host slices.
//!
//! Conventions follow LAPACK: pivots are 1-based row indices, a positive
//! return value `k` means `U(k, k)` is exactly zero, and `-k` means argument
//! `k` is invalid. Arguments are numbered as in the LAPACK routine without a
//! handle.

use batchinv_core::Element;

/// Number of elements spanned by `cols` columns of height `rows` with
/// leading dimension `ld`.
pub fn extent(rows: usize, cols: usize, ld: usize) -> usize {
    if rows == 0 || cols == 0 {
        0
    } else {
        ld * (cols - 1) + rows
    }
}

/// LU factorization with partial pivoting, in place (`getrf` for square `A`).
///
/// On a zero pivot the factorization continues and the first such column is
/// reported.
pub fn getrf<T: Element>(n: usize, a: &mut [T], lda: usize, ipiv: &mut [i32]) -> i32 {
    if lda < n.max(1) {
        return -4;
    }
    let mut info = 0;

    for j in 0..n {
        let mut p = j;
        let mut best = a[j + j * lda].magnitude();
        for i in j + 1..n {
            let m = a[i + j * lda].magnitude();
            if m > best {
                best = m;
                p = i;
            }
        }
        ipiv[j] = (p + 1) as i32;

        if a[p + j * lda] != T::zero() {
            if p != j {
                for k in 0..n {
                    a.swap(j + k * lda, p + k * lda);
                }
            }
            let pivot = a[j + j * lda];
            for i in j + 1..n {
                a[i + j * lda] /= pivot;
            }
        } else if info == 0 {
            info = (j + 1) as i32;
        }

        for k in j + 1..n {
            let ajk = a[j + k * lda];
            if ajk == T::zero() {
                continue;
            }
            for i in j + 1..n {
                let l = a[i + j * lda];
                a[i + k * lda] -= l * ajk;
            }
        }
    }

    info
}

/// Solve `A X = B` from `getrf` factors, in place on `B` (`getrs`, no
/// transpose).
#[allow(clippy::too_many_arguments)]
pub fn getrs<T: Element>(
    n: usize,
    nrhs: usize,
    a: &[T],
    lda: usize,
    ipiv: &[i32],
    b: &mut [T],
    ldb: usize,
) -> i32 {
    if lda < n.max(1) {
        return -5;
    }
    if ldb < n.max(1) {
        return -8;
    }
    if ipiv[..n].iter().any(|&p| p < 1 || p as usize > n) {
        return -6;
    }

    for (i, &p) in ipiv[..n].iter().enumerate() {
        let p = p as usize - 1;
        if p != i {
            for c in 0..nrhs {
                b.swap(i + c * ldb, p + c * ldb);
            }
        }
    }

    for c in 0..nrhs {
        let col = &mut b[c * ldb..c * ldb + n];

        // L is unit lower triangular.
        for k in 0..n {
            let bk = col[k];
            if bk == T::zero() {
                continue;
            }
            for i in k + 1..n {
                col[i] -= bk * a[i + k * lda];
            }
        }

        for k in (0..n).rev() {
            if col[k] == T::zero() {
                continue;
            }
            col[k] /= a[k + k * lda];
            let bk = col[k];
            for i in 0..k {
                col[i] -= bk * a[i + k * lda];
            }
        }
    }

    0
}

/// Out-of-place inverse from `getrf` factors (`getriBatched` semantics).
///
/// Writes `A^-1` into `c`. Fails with `k` when `U(k, k)` is zero, leaving `c`
/// untouched.
pub fn getri<T: Element>(
    n: usize,
    a: &[T],
    lda: usize,
    ipiv: &[i32],
    c: &mut [T],
    ldc: usize,
) -> i32 {
    if lda < n.max(1) {
        return -3;
    }
    if ldc < n.max(1) {
        return -6;
    }
    if let Some(k) = (0..n).find(|&k| a[k + k * lda] == T::zero()) {
        return (k + 1) as i32;
    }

    for col in 0..n {
        for row in 0..n {
            c[row + col * ldc] = if row == col { T::one() } else { T::zero() };
        }
    }

    match getrs(n, n, a, lda, ipiv, c, ldc) {
        0 => 0,
        // Map getrs argument positions onto this routine's.
        -6 => -4,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchinv_core::C64;

    fn matmul(n: usize, a: &[f64], b: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; n * n];
        for col in 0..n {
            for row in 0..n {
                out[row + col * n] = (0..n).map(|k| a[row + k * n] * b[k + col * n]).sum();
            }
        }
        out
    }

    fn invert(n: usize, a: &[f64]) -> (Vec<f64>, i32, i32) {
        let mut lu = a.to_vec();
        let mut ipiv = vec![0; n];
        let info = getrf(n, &mut lu, n, &mut ipiv);
        let mut inv = vec![0.0; n * n];
        let info_inv = getri(n, &lu, n, &ipiv, &mut inv, n);
        (inv, info, info_inv)
    }

    #[test]
    fn test_extent() {
        assert_eq!(extent(3, 3, 3), 9);
        assert_eq!(extent(3, 3, 5), 13);
        assert_eq!(extent(0, 3, 5), 0);
    }

    #[test]
    fn test_diagonal_inverse() {
        let a = vec![4.0, 0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 4.0];
        let (inv, info, info_inv) = invert(3, &a);
        assert_eq!((info, info_inv), (0, 0));
        for (i, v) in inv.iter().enumerate() {
            let expected = if i % 4 == 0 { 0.25 } else { 0.0 };
            assert!((v - expected).abs() < 1e-15, "inv[{}] = {}", i, v);
        }
    }

    #[test]
    fn test_requires_pivoting() {
        // [[0, 1], [1, 0]] column-major
        let a = vec![0.0, 1.0, 1.0, 0.0];
        let (inv, info, _) = invert(2, &a);
        assert_eq!(info, 0);
        assert_eq!(inv, vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_general_product_is_identity() {
        // [[2, 1, 1], [4, -6, 0], [-2, 7, 2]] column-major
        let a = vec![2.0, 4.0, -2.0, 1.0, -6.0, 7.0, 1.0, 0.0, 2.0];
        let (inv, info, info_inv) = invert(3, &a);
        assert_eq!((info, info_inv), (0, 0));
        let product = matmul(3, &a, &inv);
        for col in 0..3 {
            for row in 0..3 {
                let expected = if row == col { 1.0 } else { 0.0 };
                assert!(
                    (product[row + col * 3] - expected).abs() < 1e-12,
                    "(A * inv(A))[{}][{}] = {}",
                    row,
                    col,
                    product[row + col * 3]
                );
            }
        }
    }

    #[test]
    fn test_singular_reports_first_zero_pivot() {
        // [[1, 2], [1, 2]]: second pivot vanishes.
        let a = vec![1.0, 1.0, 2.0, 2.0];
        let (_, info, info_inv) = invert(2, &a);
        assert_eq!(info, 2);
        assert_eq!(info_inv, 2);

        let zeros = vec![0.0; 9];
        let (_, info, _) = invert(3, &zeros);
        assert_eq!(info, 1);
    }

    #[test]
    fn test_getrs_solves_vector() {
        // [[2, 1], [1, 3]] x = [5, 5] -> x = [2, 1]
        let mut lu: Vec<f64> = vec![2.0, 1.0, 1.0, 3.0];
        let mut ipiv = vec![0; 2];
        assert_eq!(getrf(2, &mut lu, 2, &mut ipiv), 0);
        let mut b: Vec<f64> = vec![5.0, 5.0];
        assert_eq!(getrs(2, 1, &lu, 2, &ipiv, &mut b, 2), 0);
        assert!((b[0] - 2.0).abs() < 1e-12);
        assert!((b[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_leading_dimension_padding() {
        // 2×2 matrix stored with lda = 3; the padding row must be ignored.
        let mut lu = vec![2.0, 0.0, 99.0, 0.0, 2.0, 99.0];
        let mut ipiv = vec![0; 2];
        assert_eq!(getrf(2, &mut lu, 3, &mut ipiv), 0);
        let mut c = vec![0.0; 6];
        assert_eq!(getri(2, &lu, 3, &ipiv, &mut c, 3), 0);
        assert_eq!(c[0], 0.5);
        assert_eq!(c[4], 0.5);
        assert_eq!(c[2], 0.0);
    }

    #[test]
    fn test_invalid_arguments() {
        let mut a = vec![1.0; 4];
        let mut ipiv = vec![0; 2];
        assert_eq!(getrf(2, &mut a, 1, &mut ipiv), -4);

        let bad_pivots = vec![0, 7];
        let mut b = vec![1.0; 4];
        assert_eq!(getrs(2, 2, &a, 2, &bad_pivots, &mut b, 2), -6);
        assert_eq!(getrs(2, 2, &a, 2, &[1, 2], &mut b, 1), -8);
        assert_eq!(getri(2, &a, 2, &bad_pivots, &mut b, 2), -4);
    }

    #[test]
    fn test_complex_inverse() {
        // [[i, 0], [0, 2]] -> [[-i, 0], [0, 0.5]]
        let i = C64::new(0.0, 1.0);
        let z = C64::new(0.0, 0.0);
        let mut lu = vec![i, z, z, C64::new(2.0, 0.0)];
        let mut ipiv = vec![0; 2];
        assert_eq!(getrf(2, &mut lu, 2, &mut ipiv), 0);
        let mut c = vec![z; 4];
        assert_eq!(getri(2, &lu, 2, &ipiv, &mut c, 2), 0);
        assert!((c[0] - C64::new(0.0, -1.0)).norm() < 1e-15);
        assert!((c[3] - C64::new(0.5, 0.0)).norm() < 1e-15);
        assert!(c[1].norm() < 1e-15);
    }
}
