//! One-body expectation values ⟨Ψ_T|A|φ⟩ from single-qubit Z estimates.

use nalgebra::DMatrix;
use num_complex::Complex64;

use super::amplitude::{AmplitudeEstimator, PauliCache};
use crate::error::Result;
use crate::linalg::is_diagonal;

const ZERO_PART_EPS: f64 = 1e-14;

/// ⟨Ψ_T|A|φ⟩ for a Hermitian A = U diag(λ) U†, i.e. Σ_i λ_i ½(ovlp − ⟨Z_i⟩_U).
fn hermitian_expectation(
    part: &DMatrix<Complex64>,
    identity: &mut PauliCache,
    estimator: &AmplitudeEstimator,
    ovlp: Complex64,
    decimals: u32,
) -> Result<Complex64> {
    let mut total = Complex64::new(0.0, 0.0);
    if is_diagonal(part, decimals) {
        for i in 0..part.nrows() {
            total += part[(i, i)] * identity.occupation(i, ovlp)?;
        }
    } else {
        let eigen = part.clone().symmetric_eigen();
        let mut rotated = PauliCache::new(estimator, Some(&eigen.eigenvectors));
        for (i, lambda) in eigen.eigenvalues.iter().enumerate() {
            total += *lambda * rotated.occupation(i, ovlp)?;
        }
    }
    Ok(total)
}

/// Unnormalised one-body expectations ⟨Ψ_T|A_k|φ⟩ for every operator, in
/// input order.
///
/// Non-Hermitian operators are split as A = H₁ + iH₂ with H₁ = (A + A†)/2 and
/// H₂ = (A − A†)/2i; a part that vanishes is skipped. Identity-basis Z
/// estimates are shared across all operators of the call.
pub fn q_expect_one_body(
    estimator: &AmplitudeEstimator,
    operators: &[DMatrix<Complex64>],
    ovlp: Complex64,
    decimals: u32,
) -> Result<Vec<Complex64>> {
    let mut identity = PauliCache::new(estimator, None);
    let mut expectations = Vec::with_capacity(operators.len());

    for op in operators {
        let adjoint = op.adjoint();
        let hermitian = (op + &adjoint).scale(0.5);
        let anti = (op - &adjoint) * Complex64::new(0.0, -0.5);

        let mut value = Complex64::new(0.0, 0.0);
        if hermitian.camax() > ZERO_PART_EPS {
            value += hermitian_expectation(&hermitian, &mut identity, estimator, ovlp, decimals)?;
        }
        if anti.camax() > ZERO_PART_EPS {
            value += Complex64::i() * hermitian_expectation(&anti, &mut identity, estimator, ovlp, decimals)?;
        }
        expectations.push(value);
    }
    Ok(expectations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::SlaterTrialCircuit;
    use crate::device::StatevectorDevice;
    use crate::linalg::reortho;
    use approx::assert_relative_eq;

    fn walker() -> DMatrix<Complex64> {
        let a = DMatrix::from_fn(4, 2, |i, j| {
            Complex64::new(1.0 / (1.0 + i as f64 + 2.0 * j as f64), 0.3 * ((i + j) as f64).sin())
        });
        reortho(&a).0
    }

    fn trial() -> DMatrix<Complex64> {
        let a = DMatrix::from_fn(4, 2, |i, j| {
            let d = if i == j { 1.0 } else { 0.0 };
            Complex64::new(d + 0.2 * (i as f64 - j as f64).cos(), 0.0)
        });
        reortho(&a).0
    }

    /// Classical reference ⟨T|A|φ⟩ = ⟨T|φ⟩ Σ_pq A_pq G_pq
    fn reference(t: &DMatrix<Complex64>, w: &DMatrix<Complex64>, a: &DMatrix<Complex64>) -> Complex64 {
        let m = t.adjoint() * w;
        let ovlp = m.determinant();
        let theta = w * m.try_inverse().unwrap();
        let mut total = Complex64::new(0.0, 0.0);
        for p in 0..a.nrows() {
            for q in 0..a.ncols() {
                let g = (0..w.ncols()).map(|k| theta[(q, k)] * t[(p, k)].conj()).sum::<Complex64>();
                total += a[(p, q)] * g;
            }
        }
        ovlp * total
    }

    #[test]
    fn test_matches_classical_expectation() {
        let (t, w) = (trial(), walker());
        let v_t = SlaterTrialCircuit::new(&t);
        let device = StatevectorDevice::new();
        let estimator = AmplitudeEstimator::new(&w, &v_t, &device).unwrap();
        let ovlp = estimator.amplitude().unwrap();

        let diagonal = DMatrix::from_diagonal(&nalgebra::DVector::from_vec(vec![
            Complex64::new(0.5, 0.0),
            Complex64::new(-1.0, 0.0),
            Complex64::new(0.25, 0.0),
            Complex64::new(2.0, 0.0),
        ]));
        let real_symmetric = DMatrix::from_fn(4, 4, |i, j| Complex64::new(0.1 * (i + j) as f64 + 0.05, 0.0));
        // anti-Hermitian i·L, the form of the propagator's fluctuation factors
        let imaginary = real_symmetric.map(|x| x * Complex64::i());
        let ops = vec![diagonal, real_symmetric, imaginary];

        let values = q_expect_one_body(&estimator, &ops, ovlp, 7).unwrap();
        assert_eq!(values.len(), 3);
        for (op, value) in ops.iter().zip(values.iter()) {
            let expected = reference(&t, &w, op);
            assert_relative_eq!((value - expected).norm(), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_zero_operator_gives_zero() {
        let w = walker();
        let v_t = SlaterTrialCircuit::new(&trial());
        let device = StatevectorDevice::new();
        let estimator = AmplitudeEstimator::new(&w, &v_t, &device).unwrap();
        let zero = DMatrix::<Complex64>::zeros(4, 4);
        let values = q_expect_one_body(&estimator, &[zero], Complex64::new(1.0, 0.0), 7).unwrap();
        assert_eq!(values, vec![Complex64::new(0.0, 0.0)]);
    }
}
