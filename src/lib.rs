//! Quantum AFQMC - hybrid quantum-classical auxiliary-field quantum Monte Carlo
//!
//! This crate provides phaseless AFQMC with walker overlaps and local energies
//! estimated from quantum-circuit measurement statistics, alongside the exact
//! classical estimators they are compared against.

pub mod error;
pub mod linalg;
pub mod circuit;
pub mod device;
pub mod estimator;
pub mod systems;
pub mod sampling;
pub mod io;

// Re-export commonly used types at crate root
pub use error::{AfqmcError, DeviceError, Result};
pub use linalg::{complete_unitary, reortho};
pub use circuit::{orbital_rotation, Circuit, Gate, SlaterTrialCircuit, TrialState};
pub use device::{QuantumDevice, ShotDevice, StatevectorDevice};
pub use estimator::{amplitude_estimate, local_energy_quantum, pauli_estimate, q_expect_one_body, AmplitudeEstimator};
pub use systems::{CholeskyHamiltonian, ModelSystem};
pub use sampling::{
    imag_time_propagator_qaee, q_imag_time_propagator, q_propagate_walker, AFQMCParams, AFQMCResults,
    AFQMCSimulation, EnergyCalculator, LogMetrics, MetricsSink, PropagationMode, QuantumEnergy,
};
pub use io::{read_run_config, RunConfig, SystemConfig};
