//! Quantum-assisted step drivers.
//!
//! `imag_time_propagator_qaee` keeps the classical walker dynamics and only
//! reads the energy from the quantum trial; `q_imag_time_propagator` lets the
//! quantum estimates drive the force bias, the energy and the weight.

use log::debug;
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use rand::Rng;

use super::classical::{apply_propagator, greens_function, overlap, propagate_walker};
use super::step::{draw_fields, update_weight, HybridStep, QuantumStep, StepContext};
use super::traits::EnergyCalculator;
use crate::error::{AfqmcError, Result};
use crate::estimator::{amplitude_estimate, local_energy_quantum, q_expect_one_body, AmplitudeEstimator};

fn check_overlap(ctx: &StepContext, ovlp: Complex64) -> Result<()> {
    if ovlp.norm() < ctx.overlap_tolerance {
        return Err(AfqmcError::VanishingOverlap {
            step: ctx.step,
            magnitude: ovlp.norm(),
        });
    }
    Ok(())
}

fn propagate_with_estimator(
    x: &DVector<f64>,
    ctx: &StepContext,
    estimator: &AmplitudeEstimator,
    walker: &DMatrix<Complex64>,
    ovlp: Complex64,
) -> Result<DMatrix<Complex64>> {
    let ham = ctx.hamiltonian;
    let raw = q_expect_one_body(estimator, &ham.v_gamma, ovlp, ctx.decimals)?;
    let v_expectation = DVector::from_iterator(raw.len(), raw.into_iter().map(|v| v / ovlp));
    Ok(apply_propagator(x, &v_expectation, ham, ctx.dtau, walker))
}

/// Propagate `walker` with the force bias estimated on the quantum device.
///
/// `ovlp` is the quantum overlap ⟨Ψ_Q|φ⟩ used to normalise the one-body
/// expectations.
pub fn q_propagate_walker(
    x: &DVector<f64>,
    ctx: &StepContext,
    walker: &DMatrix<Complex64>,
    ovlp: Complex64,
) -> Result<DMatrix<Complex64>> {
    check_overlap(ctx, ovlp)?;
    let estimator = AmplitudeEstimator::new(walker, ctx.trial_state, ctx.device)?;
    propagate_with_estimator(x, ctx, &estimator, walker, ovlp)
}

/// Classical walker update plus quantum energy readout.
pub fn imag_time_propagator_qaee<R: Rng>(
    ctx: &StepContext,
    walker: &DMatrix<Complex64>,
    weight: f64,
    rng: &mut R,
) -> Result<HybridStep> {
    let ham = ctx.hamiltonian;
    let c_ovlp = overlap(ctx.trial, walker);
    let green = greens_function(ctx.trial, walker)?;
    let energy = ham.local_energy(&green);

    let estimator = AmplitudeEstimator::new(walker, ctx.trial_state, ctx.device)?;
    let q_ovlp = estimator.amplitude()?;
    let e_q = local_energy_quantum(&estimator, q_ovlp, &ham.h_chem, &ham.lambda_l, &ham.u_l, ctx.decimals)?
        + q_ovlp * ham.enuc;

    let x = draw_fields(ham.num_fields(), rng);
    let new_walker = propagate_walker(&x, ham, ctx.dtau, walker, &green);
    let new_ovlp = overlap(ctx.trial, &new_walker);
    let new_weight = update_weight(weight, ctx.dtau, energy, ctx.e_shift, c_ovlp, new_ovlp);
    debug!(
        "hybrid step {}: E_loc = {:.8}, quantum overlap ratio = {:.6}",
        ctx.step,
        energy.re,
        q_ovlp / c_ovlp
    );

    Ok(HybridStep {
        energy,
        quantum_energy: e_q / c_ovlp,
        overlap_ratio: q_ovlp / c_ovlp,
        walker: new_walker,
        weight: new_weight,
    })
}

/// Fully quantum step: energy, force bias and weight all from device estimates.
pub fn q_imag_time_propagator<R: Rng>(
    ctx: &StepContext,
    walker: &DMatrix<Complex64>,
    weight: f64,
    ovlp: Complex64,
    rng: &mut R,
) -> Result<QuantumStep> {
    check_overlap(ctx, ovlp)?;
    let ham = ctx.hamiltonian;
    let estimator = AmplitudeEstimator::new(walker, ctx.trial_state, ctx.device)?;
    let energy = local_energy_quantum(&estimator, ovlp, &ham.h_chem, &ham.lambda_l, &ham.u_l, ctx.decimals)? / ovlp
        + ham.enuc;

    let x = draw_fields(ham.num_fields(), rng);
    let new_walker = propagate_with_estimator(&x, ctx, &estimator, walker, ovlp)?;
    let new_ovlp = amplitude_estimate(&new_walker, ctx.trial_state, ctx.device)?;
    let new_weight = update_weight(weight, ctx.dtau, energy, ctx.e_shift, ovlp, new_ovlp);
    debug!("quantum step {}: E_loc = {:.8}, weight {:.6} -> {:.6}", ctx.step, energy.re, weight, new_weight);

    Ok(QuantumStep {
        energy,
        overlap: new_ovlp,
        walker: new_walker,
        weight: new_weight,
    })
}
