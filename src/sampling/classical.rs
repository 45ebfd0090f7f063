//! Classical AFQMC collaborator: exact overlaps, mixed Green's functions,
//! local energies and the force-biased walker propagation.

use log::debug;
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use rand::Rng;

use super::step::{draw_fields, update_weight, ClassicalStep, StepContext};
use super::traits::EnergyCalculator;
use crate::error::{AfqmcError, Result};
use crate::linalg::reortho;
use crate::systems::CholeskyHamiltonian;

/// ⟨Ψ_T|φ⟩ = det(T†W)
pub fn overlap(trial: &DMatrix<Complex64>, walker: &DMatrix<Complex64>) -> Complex64 {
    (trial.adjoint() * walker).determinant()
}

/// Mixed Green's function G_pq = ⟨Ψ_T|a†_p a_q|φ⟩ / ⟨Ψ_T|φ⟩ = [W (T†W)⁻¹ T†]_qp.
pub fn greens_function(trial: &DMatrix<Complex64>, walker: &DMatrix<Complex64>) -> Result<DMatrix<Complex64>> {
    let inv = (trial.adjoint() * walker)
        .try_inverse()
        .ok_or(AfqmcError::SingularOverlap)?;
    Ok((walker * inv * trial.adjoint()).transpose())
}

/// E = Σ h_pq G_pq + ½ Σ (pq|rs)(G_pq G_rs − G_ps G_rq) + E_nuc
pub fn local_energy(h1e: &DMatrix<Complex64>, eri: &DMatrix<f64>, green: &DMatrix<Complex64>, enuc: f64) -> Complex64 {
    let n = green.nrows();
    let one_body = h1e.component_mul(green).sum();

    let mut two_body = Complex64::new(0.0, 0.0);
    for p in 0..n {
        for q in 0..n {
            for r in 0..n {
                for s in 0..n {
                    let v = eri[(p * n + q, r * n + s)];
                    if v == 0.0 {
                        continue;
                    }
                    two_body += v * (green[(p, q)] * green[(r, s)] - green[(p, s)] * green[(r, q)]);
                }
            }
        }
    }

    one_body + 0.5 * two_body + enuc
}

/// Apply B(x − x̄) = exp(−dτ/2 v_0) exp(√dτ Σ_γ (x_γ − x̄_γ) v_γ) exp(−dτ/2 v_0)
/// with force bias x̄ = −√dτ (⟨v_γ⟩ − mf_shift), then reorthonormalise.
pub(crate) fn apply_propagator(
    x: &DVector<f64>,
    v_expectation: &DVector<Complex64>,
    hamiltonian: &CholeskyHamiltonian,
    dtau: f64,
    walker: &DMatrix<Complex64>,
) -> DMatrix<Complex64> {
    let sqrt_dtau = dtau.sqrt();
    let xbar = -(v_expectation - &hamiltonian.mf_shift).scale(sqrt_dtau);

    let n = walker.nrows();
    let mut v = DMatrix::<Complex64>::zeros(n, n);
    for (k, v_gamma) in hamiltonian.v_gamma.iter().enumerate() {
        let shifted = Complex64::new(x[k], 0.0) - xbar[k];
        v += v_gamma * (shifted * sqrt_dtau);
    }

    let half = hamiltonian.v_0.scale(-0.5 * dtau).exp();
    let b = &half * v.exp() * &half;
    let (new_walker, _) = reortho(&(b * walker));
    new_walker
}

/// Propagate one walker with the classical force bias ⟨v_γ⟩ = Σ_pq (v_γ)_pq G_pq.
pub fn propagate_walker(
    x: &DVector<f64>,
    hamiltonian: &CholeskyHamiltonian,
    dtau: f64,
    walker: &DMatrix<Complex64>,
    green: &DMatrix<Complex64>,
) -> DMatrix<Complex64> {
    let v_expectation = DVector::from_iterator(
        hamiltonian.v_gamma.len(),
        hamiltonian.v_gamma.iter().map(|v| v.component_mul(green).sum()),
    );
    apply_propagator(x, &v_expectation, hamiltonian, dtau, walker)
}

/// Classical step driver: local energy, propagation and weight update.
pub fn imag_time_propagator<R: Rng>(
    ctx: &StepContext,
    walker: &DMatrix<Complex64>,
    weight: f64,
    rng: &mut R,
) -> Result<ClassicalStep> {
    let ham = ctx.hamiltonian;
    let ovlp = overlap(ctx.trial, walker);
    let green = greens_function(ctx.trial, walker)?;
    let energy = ham.local_energy(&green);

    let x = draw_fields(ham.num_fields(), rng);
    let new_walker = propagate_walker(&x, ham, ctx.dtau, walker, &green);
    let new_ovlp = overlap(ctx.trial, &new_walker);
    let new_weight = update_weight(weight, ctx.dtau, energy, ctx.e_shift, ovlp, new_ovlp);
    debug!("classical step {}: E_loc = {:.8}, weight {:.6} -> {:.6}", ctx.step, energy.re, weight, new_weight);

    Ok(ClassicalStep {
        energy,
        walker: new_walker,
        weight: new_weight,
    })
}
