//! Quantum local-energy numerator ⟨Ψ_T|H|φ⟩.

use log::debug;
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use super::amplitude::{AmplitudeEstimator, PauliCache};
use crate::error::{AfqmcError, Result};
use crate::linalg::is_diagonal;

/// Σ_{i≤j} ½ λ_i λ_j E(i, j) for one Cholesky factor in its eigenbasis.
fn two_body_term(cache: &mut PauliCache, lambda: &DVector<f64>, ovlp: Complex64) -> Result<Complex64> {
    let n = lambda.len();
    let mut total = Complex64::new(0.0, 0.0);
    for i in 0..n {
        for j in i..n {
            total += 0.5 * lambda[i] * lambda[j] * cache.pair(i, j, ovlp)?;
        }
    }
    Ok(total)
}

/// Unnormalised ⟨Ψ_T|H|φ⟩ with H = Σ_i h_ii n_i + ½ Σ_γ L_γ².
///
/// Only the diagonal of `one_body` enters. Each factor L_γ = U_γ diag(λ_γ) U_γ†
/// is measured in its own eigenbasis; factors whose U_γ is diagonal to
/// `decimals` places reuse the identity-basis estimates of the one-body pass.
pub fn local_energy_quantum(
    estimator: &AmplitudeEstimator,
    ovlp: Complex64,
    one_body: &DMatrix<Complex64>,
    lambda_l: &[DVector<f64>],
    u_l: &[DMatrix<Complex64>],
    decimals: u32,
) -> Result<Complex64> {
    if lambda_l.len() != u_l.len() {
        return Err(AfqmcError::DimensionMismatch {
            context: "cholesky eigenbases",
            expected: lambda_l.len(),
            actual: u_l.len(),
        });
    }

    let n = estimator.num_qubits();
    let mut identity = PauliCache::new(estimator, None);
    let mut energy = Complex64::new(0.0, 0.0);
    for i in 0..n {
        energy += one_body[(i, i)] * identity.occupation(i, ovlp)?;
    }

    let mut rotated_factors = 0;
    for (lambda, u) in lambda_l.iter().zip(u_l) {
        if is_diagonal(u, decimals) {
            energy += two_body_term(&mut identity, lambda, ovlp)?;
        } else {
            rotated_factors += 1;
            let mut cache = PauliCache::new(estimator, Some(u));
            energy += two_body_term(&mut cache, lambda, ovlp)?;
        }
    }
    debug!(
        "quantum local energy: {} factors, {} in rotated bases",
        lambda_l.len(),
        rotated_factors
    );

    Ok(energy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::SlaterTrialCircuit;
    use crate::device::StatevectorDevice;
    use crate::sampling::classical;
    use crate::systems::ModelSystem;
    use approx::assert_relative_eq;

    #[test]
    fn test_matches_classical_local_energy() {
        let system = ModelSystem::four_orbital().unwrap();
        let ham = &system.hamiltonian;
        let v_t = SlaterTrialCircuit::new(&system.trial);
        let device = StatevectorDevice::new();

        let walker = system.perturbed_walker(0.3);
        let estimator = AmplitudeEstimator::new(&walker, &v_t, &device).unwrap();
        let ovlp = estimator.amplitude().unwrap();
        let e_q = local_energy_quantum(&estimator, ovlp, &ham.h_chem, &ham.lambda_l, &ham.u_l, 7).unwrap();

        let g = classical::greens_function(&system.trial, &walker).unwrap();
        let e_c = classical::local_energy(&ham.h1e, &ham.eri, &g, 0.0);
        assert_relative_eq!((e_q / ovlp - e_c).norm(), 0.0, epsilon = 1e-8);
    }

    #[test]
    fn test_diagonal_factors_share_identity_estimates() {
        let system = ModelSystem::two_site().unwrap();
        let ham = &system.hamiltonian;
        let v_t = SlaterTrialCircuit::new(&system.trial);
        let device = StatevectorDevice::new();
        let walker = system.trial.clone();
        let estimator = AmplitudeEstimator::new(&walker, &v_t, &device).unwrap();
        let ovlp = estimator.amplitude().unwrap();
        let e_q = local_energy_quantum(&estimator, ovlp, &ham.h_chem, &ham.lambda_l, &ham.u_l, 7).unwrap();
        assert_relative_eq!(e_q.re + ham.enuc, -0.7, epsilon = 1e-10);
        assert_relative_eq!(e_q.im, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_rejects_mismatched_factor_lists() {
        let system = ModelSystem::two_site().unwrap();
        let v_t = SlaterTrialCircuit::new(&system.trial);
        let device = StatevectorDevice::new();
        let estimator = AmplitudeEstimator::new(&system.trial, &v_t, &device).unwrap();
        let result = local_energy_quantum(
            &estimator,
            Complex64::new(1.0, 0.0),
            &system.hamiltonian.h_chem,
            &system.hamiltonian.lambda_l,
            &[],
            7,
        );
        assert!(matches!(result, Err(AfqmcError::DimensionMismatch { .. })));
    }
}
