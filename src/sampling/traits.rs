//! Traits for AFQMC sampling.

use nalgebra::DMatrix;
use num_complex::Complex64;

/// Trait for computing the mixed local energy ⟨Ψ_T|H|φ⟩/⟨Ψ_T|φ⟩ from the
/// walker's Green's function G_pq = ⟨a†_p a_q⟩.
pub trait EnergyCalculator {
    fn local_energy(&self, green: &DMatrix<Complex64>) -> Complex64;
}

/// Destination for per-step scalar metrics such as the classical (`cE`) and
/// quantum (`qE`) energy estimates.
pub trait MetricsSink {
    fn record(&self, name: &str, value: f64, step: usize);
}
