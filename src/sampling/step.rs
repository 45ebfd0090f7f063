//! Inputs and outputs shared by the per-walker step drivers.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::circuit::TrialState;
use crate::device::QuantumDevice;
use crate::systems::CholeskyHamiltonian;

/// Read-only state shared by every walker task of one time step.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub hamiltonian: &'a CholeskyHamiltonian,
    pub trial: &'a DMatrix<Complex64>,
    pub trial_state: &'a dyn TrialState,
    pub device: &'a dyn QuantumDevice,
    pub dtau: f64,
    pub e_shift: f64,
    pub step: usize,
    /// Decimal places used for the "is this matrix diagonal" tests
    pub decimals: u32,
    /// Smallest |overlap| accepted as a denominator
    pub overlap_tolerance: f64,
}

/// Classical step driver output.
#[derive(Debug, Clone)]
pub struct ClassicalStep {
    pub energy: Complex64,
    pub walker: DMatrix<Complex64>,
    pub weight: f64,
}

/// Classical dynamics with a quantum energy readout.
#[derive(Debug, Clone)]
pub struct HybridStep {
    pub energy: Complex64,
    /// ⟨Ψ_Q|H|φ⟩ / ⟨Ψ_T|φ⟩
    pub quantum_energy: Complex64,
    /// ⟨Ψ_Q|φ⟩ / ⟨Ψ_T|φ⟩
    pub overlap_ratio: Complex64,
    pub walker: DMatrix<Complex64>,
    pub weight: f64,
}

/// Fully quantum step driver output.
#[derive(Debug, Clone)]
pub struct QuantumStep {
    pub energy: Complex64,
    pub overlap: Complex64,
    pub walker: DMatrix<Complex64>,
    pub weight: f64,
}

/// Standard-normal auxiliary fields, one per Cholesky factor.
pub fn draw_fields<R: Rng + ?Sized>(num_fields: usize, rng: &mut R) -> DVector<f64> {
    DVector::from_fn(num_fields, |_, _| rng.sample(StandardNormal))
}

/// Phaseless importance-weight update:
/// w · exp(−dτ (Re E_loc − E_shift)) · max(0, cos arg(new_ovlp / ovlp)).
pub fn update_weight(
    weight: f64,
    dtau: f64,
    e_loc: Complex64,
    e_shift: f64,
    ovlp: Complex64,
    new_ovlp: Complex64,
) -> f64 {
    let arg = (new_ovlp / ovlp).arg();
    weight * (-dtau * (e_loc.re - e_shift)).exp() * arg.cos().max(0.0)
}
