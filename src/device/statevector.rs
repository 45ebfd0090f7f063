//! Dense state-vector simulation and the devices built on it.

use num_complex::Complex64;
use rand::distributions::WeightedIndex;
use rand_distr::Distribution;

use super::traits::QuantumDevice;
use crate::circuit::{Circuit, Gate};
use crate::error::DeviceError;

const DEFAULT_MAX_QUBITS: usize = 20;

/// Dense state vector of `num_qubits` qubits, qubit 0 most significant.
#[derive(Debug, Clone)]
pub struct StateVector {
    num_qubits: usize,
    amplitudes: Vec<Complex64>,
}

impl StateVector {
    /// |0…0⟩
    pub fn zero_state(num_qubits: usize) -> Self {
        Self::from_basis_state(num_qubits, 0)
    }

    /// Computational basis state |index⟩.
    pub fn from_basis_state(num_qubits: usize, index: usize) -> Self {
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); 1 << num_qubits];
        amplitudes[index] = Complex64::new(1.0, 0.0);
        Self { num_qubits, amplitudes }
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(|a| a.norm_sqr()).collect()
    }

    /// Apply every gate of `circuit` in order.
    pub fn run(mut self, circuit: &Circuit) -> Result<Self, DeviceError> {
        for gate in circuit.gates() {
            self.apply(gate)?;
        }
        Ok(self)
    }

    fn mask(&self, qubit: usize) -> Result<usize, DeviceError> {
        if qubit >= self.num_qubits {
            return Err(DeviceError::InvalidQubitIndex {
                index: qubit,
                num_qubits: self.num_qubits,
            });
        }
        Ok(1 << (self.num_qubits - 1 - qubit))
    }

    pub fn apply(&mut self, gate: &Gate) -> Result<(), DeviceError> {
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        match *gate {
            Gate::Hadamard { qubit } => {
                let h = Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0);
                self.apply_single(qubit, [[h, h], [h, -h]])
            }
            Gate::PauliX { qubit } => self.apply_single(qubit, [[zero, one], [one, zero]]),
            Gate::PauliZ { qubit } => self.apply_single(qubit, [[one, zero], [zero, -one]]),
            Gate::S { qubit } => self.apply_single(qubit, [[one, zero], [zero, Complex64::i()]]),
            Gate::RX { qubit, theta } => {
                let (s, c) = (0.5 * theta).sin_cos();
                let c = Complex64::new(c, 0.0);
                let ms = Complex64::new(0.0, -s);
                self.apply_single(qubit, [[c, ms], [ms, c]])
            }
            Gate::RY { qubit, theta } => {
                let (s, c) = (0.5 * theta).sin_cos();
                let (s, c) = (Complex64::new(s, 0.0), Complex64::new(c, 0.0));
                self.apply_single(qubit, [[c, -s], [s, c]])
            }
            Gate::RZ { qubit, theta } => {
                let m = Complex64::from_polar(1.0, -0.5 * theta);
                let p = Complex64::from_polar(1.0, 0.5 * theta);
                self.apply_single(qubit, [[m, zero], [zero, p]])
            }
            Gate::Phase { qubit, phi } => {
                self.apply_single(qubit, [[one, zero], [zero, Complex64::from_polar(1.0, phi)]])
            }
            Gate::CNOT { control, target } => self.apply_cnot(control, target),
        }
    }

    fn apply_single(&mut self, qubit: usize, m: [[Complex64; 2]; 2]) -> Result<(), DeviceError> {
        let mask = self.mask(qubit)?;
        for i in 0..self.amplitudes.len() {
            if i & mask != 0 {
                continue;
            }
            let j = i | mask;
            let (a0, a1) = (self.amplitudes[i], self.amplitudes[j]);
            self.amplitudes[i] = m[0][0] * a0 + m[0][1] * a1;
            self.amplitudes[j] = m[1][0] * a0 + m[1][1] * a1;
        }
        Ok(())
    }

    fn apply_cnot(&mut self, control: usize, target: usize) -> Result<(), DeviceError> {
        if control == target {
            return Err(DeviceError::RepeatedQubit { qubit: control });
        }
        let cmask = self.mask(control)?;
        let tmask = self.mask(target)?;
        for i in 0..self.amplitudes.len() {
            if i & cmask != 0 && i & tmask == 0 {
                self.amplitudes.swap(i, i | tmask);
            }
        }
        Ok(())
    }
}

/// Exact (shot-free) simulator returning |amplitude|² for every outcome.
#[derive(Debug, Clone)]
pub struct StatevectorDevice {
    max_qubits: usize,
}

impl Default for StatevectorDevice {
    fn default() -> Self {
        Self {
            max_qubits: DEFAULT_MAX_QUBITS,
        }
    }
}

impl StatevectorDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_qubits(mut self, max_qubits: usize) -> Self {
        self.max_qubits = max_qubits;
        self
    }

    fn simulate(&self, circuit: &Circuit) -> Result<StateVector, DeviceError> {
        if circuit.num_qubits() > self.max_qubits {
            return Err(DeviceError::TooManyQubits {
                requested: circuit.num_qubits(),
                max: self.max_qubits,
            });
        }
        StateVector::zero_state(circuit.num_qubits()).run(circuit)
    }
}

impl QuantumDevice for StatevectorDevice {
    fn name(&self) -> &str {
        "statevector"
    }

    fn probabilities(&self, circuit: &Circuit) -> Result<Vec<f64>, DeviceError> {
        Ok(self.simulate(circuit)?.probabilities())
    }
}

/// Shot-based device: empirical outcome frequencies from `shots` samples.
#[derive(Debug, Clone)]
pub struct ShotDevice {
    shots: usize,
    exact: StatevectorDevice,
}

impl ShotDevice {
    pub fn new(shots: usize) -> Self {
        Self {
            shots,
            exact: StatevectorDevice::default(),
        }
    }
}

impl QuantumDevice for ShotDevice {
    fn name(&self) -> &str {
        "shots"
    }

    fn probabilities(&self, circuit: &Circuit) -> Result<Vec<f64>, DeviceError> {
        if self.shots == 0 {
            return Err(DeviceError::NoShots);
        }
        let exact = self.exact.probabilities(circuit)?;
        let dist = WeightedIndex::new(&exact).map_err(|e| DeviceError::Sampling(e.to_string()))?;

        let mut rng = rand::thread_rng();
        let mut counts = vec![0usize; exact.len()];
        for _ in 0..self.shots {
            counts[dist.sample(&mut rng)] += 1;
        }
        Ok(counts.into_iter().map(|c| c as f64 / self.shots as f64).collect())
    }
}
