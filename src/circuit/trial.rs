//! Quantum trial states V_T.

use nalgebra::DMatrix;
use num_complex::Complex64;

use super::gate::Circuit;
use super::givens::orbital_rotation;
use crate::linalg::{complete_unitary, reortho};

/// Parameterless builder for the trial-state preparation circuit V_T.
///
/// V_T must map the reference determinant |1…10…0⟩ (first N_e qubits set) to
/// the trial state and leave the vacuum unchanged.
pub trait TrialState: Send + Sync {
    fn circuit(&self) -> Circuit;
}

impl<F> TrialState for F
where
    F: Fn() -> Circuit + Send + Sync,
{
    fn circuit(&self) -> Circuit {
        self()
    }
}

/// Trial state given by a single Slater determinant.
#[derive(Debug, Clone)]
pub struct SlaterTrialCircuit {
    circuit: Circuit,
}

impl SlaterTrialCircuit {
    /// Synthesise V_T from the (spin-orbital × electron) trial orbital matrix.
    pub fn new(trial: &DMatrix<Complex64>) -> Self {
        let (q, _) = reortho(trial);
        let circuit = orbital_rotation(&complete_unitary(&q));
        Self { circuit }
    }
}

impl TrialState for SlaterTrialCircuit {
    fn circuit(&self) -> Circuit {
        self.circuit.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::StateVector;
    use approx::assert_relative_eq;

    #[test]
    fn test_slater_trial_prepares_determinant() {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let trial = DMatrix::from_row_slice(
            3,
            1,
            &[Complex64::new(s, 0.0), Complex64::new(0.0, 0.5), Complex64::new(0.5, 0.0)],
        );
        let v_t = SlaterTrialCircuit::new(&trial);
        assert_eq!(v_t.circuit().num_qubits(), 3);

        // reference |100⟩ has index 4
        let state = StateVector::from_basis_state(3, 4).run(&v_t.circuit()).unwrap();
        assert_relative_eq!((state.amplitudes()[4] - trial[(0, 0)]).norm(), 0.0, epsilon = 1e-10);
        assert_relative_eq!((state.amplitudes()[2] - trial[(1, 0)]).norm(), 0.0, epsilon = 1e-10);
        assert_relative_eq!((state.amplitudes()[1] - trial[(2, 0)]).norm(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_closure_trial_state() {
        let builder = || Circuit::new(2);
        let trial: &dyn TrialState = &builder;
        assert!(trial.circuit().is_empty());
    }
}
