//! Amplitude and Pauli-string estimation with the vacuum-reference circuit.
//!
//! The control qubit 0 is entangled with qubits 1..N_e so that the register
//! holds (|vac⟩ + |ref⟩)/√2. The walker's orbital rotation turns |ref⟩ into
//! the walker determinant |φ⟩ and keeps |vac⟩ fixed; after an optional
//! operator O and V_T†, the entangling layer and Hadamard are undone. Then
//!
//!   P(0…0) − P(10…0) = Re⟨Ψ_T|O|φ⟩
//!
//! and inserting S† (three S gates) before the final Hadamard gives the
//! imaginary part.

use std::collections::HashMap;

use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::circuit::{orbital_rotation, Circuit, Gate, TrialState};
use crate::device::QuantumDevice;
use crate::error::{AfqmcError, Result};
use crate::linalg::{complete_unitary, is_identity, reortho};

/// Measurement circuits for one walker against one trial state.
pub struct AmplitudeEstimator<'a> {
    device: &'a dyn QuantumDevice,
    num_qubits: usize,
    prepare: Circuit,
    unprepare_real: Circuit,
    unprepare_imag: Circuit,
}

impl<'a> AmplitudeEstimator<'a> {
    pub fn new(walker: &DMatrix<Complex64>, trial: &dyn TrialState, device: &'a dyn QuantumDevice) -> Result<Self> {
        let (num_qubits, num_particles) = walker.shape();
        if num_particles == 0 || num_particles > num_qubits {
            return Err(AfqmcError::InvalidConfig(format!(
                "walker with {} orbitals and {} electrons",
                num_qubits, num_particles
            )));
        }
        let v_t = trial.circuit();
        if v_t.num_qubits() != num_qubits {
            return Err(AfqmcError::DimensionMismatch {
                context: "trial circuit qubits",
                expected: num_qubits,
                actual: v_t.num_qubits(),
            });
        }

        // first half: branch superposition, then the walker's orbital rotation
        let mut prepare = Circuit::new(num_qubits);
        prepare.push(Gate::Hadamard { qubit: 0 });
        for i in 1..num_particles {
            prepare.push(Gate::CNOT { control: 0, target: i });
        }
        let (q, _) = reortho(walker);
        prepare.append(&orbital_rotation(&complete_unitary(&q)));

        // second half: V_T†, undo entangling layer, (S†,) Hadamard
        let mut unprepare = v_t.adjoint();
        for i in (1..num_particles).rev() {
            unprepare.push(Gate::CNOT { control: 0, target: i });
        }
        let mut unprepare_real = unprepare.clone();
        unprepare_real.push(Gate::Hadamard { qubit: 0 });
        let mut unprepare_imag = unprepare;
        for _ in 0..3 {
            unprepare_imag.push(Gate::S { qubit: 0 });
        }
        unprepare_imag.push(Gate::Hadamard { qubit: 0 });

        Ok(Self {
            device,
            num_qubits,
            prepare,
            unprepare_real,
            unprepare_imag,
        })
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    fn readout(&self, middle: &Circuit, second_half: &Circuit) -> Result<f64> {
        let mut circuit = self.prepare.clone();
        circuit.append(middle);
        circuit.append(second_half);
        let probs = self.device.probabilities(&circuit)?;
        Ok(probs[0] - probs[1 << (self.num_qubits - 1)])
    }

    fn measure(&self, middle: &Circuit) -> Result<Complex64> {
        let re = self.readout(middle, &self.unprepare_real)?;
        let im = self.readout(middle, &self.unprepare_imag)?;
        Ok(Complex64::new(re, im))
    }

    /// ⟨Ψ_T|φ⟩
    pub fn amplitude(&self) -> Result<Complex64> {
        self.measure(&Circuit::new(self.num_qubits))
    }

    /// ⟨Ψ_T| V Z_S V† |φ⟩ where `basis` is the orbital-rotation circuit V
    /// (None for the identity) and `paulis` lists the qubits of Z_S.
    pub fn pauli(&self, basis: Option<&Circuit>, paulis: &[usize]) -> Result<Complex64> {
        let mut middle = Circuit::new(self.num_qubits);
        if let Some(v) = basis {
            middle.append(&v.adjoint());
        }
        for &qubit in paulis {
            middle.push(Gate::PauliZ { qubit });
        }
        if let Some(v) = basis {
            middle.append(v);
        }
        self.measure(&middle)
    }
}

/// Overlap ⟨trial|walker⟩ estimated on `device`.
pub fn amplitude_estimate(
    walker: &DMatrix<Complex64>,
    trial: &dyn TrialState,
    device: &dyn QuantumDevice,
) -> Result<Complex64> {
    AmplitudeEstimator::new(walker, trial, device)?.amplitude()
}

/// ⟨trial| U Z_S U† |walker⟩ for the orbital rotation `u` and Z string `paulis`.
///
/// `u` equal to the identity to `decimals` places skips the basis change.
pub fn pauli_estimate(
    walker: &DMatrix<Complex64>,
    trial: &dyn TrialState,
    u: &DMatrix<Complex64>,
    paulis: &[usize],
    device: &dyn QuantumDevice,
    decimals: u32,
) -> Result<Complex64> {
    let estimator = AmplitudeEstimator::new(walker, trial, device)?;
    if is_identity(u, decimals) {
        estimator.pauli(None, paulis)
    } else {
        estimator.pauli(Some(&orbital_rotation(u)), paulis)
    }
}

/// Lazily filled Z-string estimates in one rotated basis, scoped to a single
/// estimator invocation.
pub struct PauliCache<'e, 'a> {
    estimator: &'e AmplitudeEstimator<'a>,
    basis: Option<Circuit>,
    values: HashMap<Vec<usize>, Complex64>,
}

impl<'e, 'a> PauliCache<'e, 'a> {
    pub fn new(estimator: &'e AmplitudeEstimator<'a>, u: Option<&DMatrix<Complex64>>) -> Self {
        Self {
            estimator,
            basis: u.map(orbital_rotation),
            values: HashMap::new(),
        }
    }

    pub fn get(&mut self, paulis: &[usize]) -> Result<Complex64> {
        if let Some(value) = self.values.get(paulis) {
            return Ok(*value);
        }
        let value = self.estimator.pauli(self.basis.as_ref(), paulis)?;
        self.values.insert(paulis.to_vec(), value);
        Ok(value)
    }

    /// Unnormalised ⟨n_i⟩ = ½(ovlp − ⟨Z_i⟩)
    pub fn occupation(&mut self, i: usize, ovlp: Complex64) -> Result<Complex64> {
        Ok(0.5 * (ovlp - self.get(&[i])?))
    }

    /// Pair term of the squared one-body operator: ⟨n_i⟩ for i = j and
    /// ½(ovlp − ⟨Z_i⟩ − ⟨Z_j⟩ + ⟨Z_i Z_j⟩) = 2⟨n_i n_j⟩ for i < j.
    pub fn pair(&mut self, i: usize, j: usize, ovlp: Complex64) -> Result<Complex64> {
        if i == j {
            return self.occupation(i, ovlp);
        }
        let zi = self.get(&[i])?;
        let zj = self.get(&[j])?;
        let zij = self.get(&[i, j])?;
        Ok(0.5 * (ovlp - zi - zj + zij))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
