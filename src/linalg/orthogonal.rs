//! Reorthogonalisation of walker orbitals and related matrix utilities.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

/// Reorthogonalise an M×N matrix `a` (M ≥ N, full column rank).
///
/// Performs an economy QR decomposition A = QR and moves the phase of every
/// diagonal element of R into the matching column of Q, so that R has a
/// real non-negative diagonal. Returns the adjusted Q together with det(R).
pub fn reortho(a: &DMatrix<Complex64>) -> (DMatrix<Complex64>, f64) {
    let qr = a.clone().qr();
    let mut q = qr.q();
    let mut r = qr.r();

    for k in 0..r.nrows() {
        let d = r[(k, k)];
        let norm = d.norm();
        let sign = if norm > 0.0 { d / norm } else { Complex64::new(1.0, 0.0) };
        for i in 0..q.nrows() {
            q[(i, k)] *= sign;
        }
        let conj = sign.conj();
        for j in k..r.ncols() {
            r[(k, j)] *= conj;
        }
    }

    let det_r = (0..r.nrows()).map(|k| r[(k, k)].re).product();
    (q, det_r)
}

/// Extend an orthonormal M×N matrix to an M×M unitary.
///
/// The first N columns of the result equal `q`. The remaining columns are
/// picked greedily from the standard basis, each time taking the vector with
/// the largest component orthogonal to the columns already chosen.
pub fn complete_unitary(q: &DMatrix<Complex64>) -> DMatrix<Complex64> {
    let n = q.nrows();
    let mut columns: Vec<DVector<Complex64>> = q.column_iter().map(|c| c.into_owned()).collect();

    while columns.len() < n {
        let mut best: Option<(f64, DVector<Complex64>)> = None;
        for p in 0..n {
            let mut v = DVector::<Complex64>::zeros(n);
            v[p] = Complex64::new(1.0, 0.0);
            // two passes of classical Gram-Schmidt
            for _ in 0..2 {
                for c in &columns {
                    let proj = c.dotc(&v);
                    v -= c * proj;
                }
            }
            let norm = v.norm();
            if best.as_ref().map_or(true, |(b, _)| norm > *b) {
                best = Some((norm, v));
            }
        }
        match best {
            Some((norm, v)) if norm > 0.0 => columns.push(v.unscale(norm)),
            _ => break,
        }
    }

    DMatrix::from_columns(&columns)
}

fn round_to(x: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (x * scale).round() / scale
}

/// True when every off-diagonal element rounds to zero at `decimals` places.
pub fn is_diagonal(m: &DMatrix<Complex64>, decimals: u32) -> bool {
    for j in 0..m.ncols() {
        for i in 0..m.nrows() {
            if i == j {
                continue;
            }
            let z = m[(i, j)];
            if round_to(z.re, decimals) != 0.0 || round_to(z.im, decimals) != 0.0 {
                return false;
            }
        }
    }
    true
}

/// True when `m` rounds to the identity at `decimals` places.
pub fn is_identity(m: &DMatrix<Complex64>, decimals: u32) -> bool {
    m.is_square()
        && is_diagonal(m, decimals)
        && (0..m.nrows()).all(|k| {
            round_to(m[(k, k)].re, decimals) == 1.0 && round_to(m[(k, k)].im, decimals) == 0.0
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn complex_matrix(rows: usize, cols: usize, data: &[f64]) -> DMatrix<Complex64> {
        let mut m = DMatrix::from_fn(rows, cols, |i, j| {
            let k = 2 * (i * cols + j);
            Complex64::new(data[k], data[k + 1])
        });
        // keep the matrix comfortably full rank
        for k in 0..cols {
            m[(k, k)] += Complex64::new(2.0, 0.0);
        }
        m
    }

    proptest! {
        #[test]
        fn test_reortho_reconstructs_input(data in proptest::collection::vec(-1.0f64..1.0, 16)) {
            let a = complex_matrix(4, 2, &data);
            let (q, det_r) = reortho(&a);

            let qhq = q.adjoint() * &q;
            let identity = DMatrix::<Complex64>::identity(2, 2);
            prop_assert!((qhq - identity).norm() < 1e-10);

            let r = q.adjoint() * &a;
            prop_assert!(r[(1, 0)].norm() < 1e-10);
            for k in 0..2 {
                prop_assert!(r[(k, k)].re >= -1e-12);
                prop_assert!(r[(k, k)].im.abs() < 1e-10);
            }
            prop_assert!((&q * &r - &a).norm() < 1e-10);

            let expected_det = r[(0, 0)].re * r[(1, 1)].re;
            prop_assert!((det_r - expected_det).abs() < 1e-10);
        }
    }

    #[test]
    fn test_reortho_keeps_orthonormal_columns() {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let a = DMatrix::from_row_slice(2, 1, &[Complex64::new(s, 0.0), Complex64::new(0.0, s)]);
        let (q, det_r) = reortho(&a);
        assert_relative_eq!(det_r, 1.0, epsilon = 1e-12);
        assert_relative_eq!((q - a).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_reortho_flips_negative_diagonal() {
        let a = DMatrix::from_row_slice(
            3,
            2,
            &[
                Complex64::new(-2.0, 0.0), Complex64::new(1.0, 0.0),
                Complex64::new(0.0, 0.0), Complex64::new(-3.0, 0.0),
                Complex64::new(0.0, 0.0), Complex64::new(0.0, 0.0),
            ],
        );
        let (q, det_r) = reortho(&a);
        assert_relative_eq!(det_r, 6.0, epsilon = 1e-12);
        assert_relative_eq!(q[(0, 0)].re, -1.0, epsilon = 1e-12);
        assert_relative_eq!(q[(1, 1)].re, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_complete_unitary() {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let q = DMatrix::from_row_slice(
            4,
            2,
            &[
                Complex64::new(s, 0.0), Complex64::new(0.0, 0.0),
                Complex64::new(0.0, s), Complex64::new(0.0, 0.0),
                Complex64::new(0.0, 0.0), Complex64::new(0.6, 0.0),
                Complex64::new(0.0, 0.0), Complex64::new(0.0, 0.8),
            ],
        );
        let w = complete_unitary(&q);
        assert_eq!(w.shape(), (4, 4));
        let identity = DMatrix::<Complex64>::identity(4, 4);
        assert_relative_eq!((w.adjoint() * &w - identity).norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!((w.columns(0, 2) - &q).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_diagonal_tolerance() {
        let mut m = DMatrix::<Complex64>::identity(3, 3);
        assert!(is_diagonal(&m, 7));
        assert!(is_identity(&m, 7));

        m[(0, 2)] = Complex64::new(4e-8, 0.0);
        assert!(is_diagonal(&m, 7));

        m[(0, 2)] = Complex64::new(0.0, 2e-6);
        assert!(!is_diagonal(&m, 7));
        assert!(is_diagonal(&m, 5));

        let mut d = DMatrix::<Complex64>::identity(2, 2);
        d[(1, 1)] = Complex64::new(-1.0, 0.0);
        assert!(is_diagonal(&d, 7));
        assert!(!is_identity(&d, 7));
    }
}
