//! Trait for quantum execution backends.

use crate::circuit::Circuit;
use crate::error::DeviceError;

/// A backend that executes a circuit and reports computational-basis outcome
/// probabilities (length 2^n, qubit 0 most significant).
///
/// Devices are shared by every walker task of a time step, so implementations
/// must be reentrant.
pub trait QuantumDevice: Send + Sync {
    /// Backend name, used in log records.
    fn name(&self) -> &str;

    /// Execute `circuit` and return the outcome distribution.
    fn probabilities(&self, circuit: &Circuit) -> Result<Vec<f64>, DeviceError>;
}
