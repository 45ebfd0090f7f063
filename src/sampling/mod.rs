//! Sampling module - AFQMC walker propagation and population control.

mod traits;
mod step;
pub mod classical;
mod propagator;
mod afqmc;
mod metrics;

pub use traits::{EnergyCalculator, MetricsSink};
pub use step::{draw_fields, update_weight, ClassicalStep, HybridStep, QuantumStep, StepContext};
pub use propagator::{imag_time_propagator_qaee, q_imag_time_propagator, q_propagate_walker};
pub use afqmc::{
    ratio_energy, time_key, weighted_energy, AFQMCParams, AFQMCResults, AFQMCSimulation, PropagationMode,
    QuantumEnergy,
};
pub use metrics::{LogMetrics, RecordingMetrics};
