//! Gate and circuit descriptions handed to a quantum device.

use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

/// A single- or two-qubit gate.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum Gate {
    Hadamard { qubit: usize },
    PauliX { qubit: usize },
    PauliZ { qubit: usize },
    /// Quarter-turn phase diag(1, i)
    S { qubit: usize },
    RX { qubit: usize, theta: f64 },
    RY { qubit: usize, theta: f64 },
    RZ { qubit: usize, theta: f64 },
    /// Phase gate diag(1, e^{iφ}); leaves |0⟩ untouched
    Phase { qubit: usize, phi: f64 },
    CNOT { control: usize, target: usize },
}

impl Gate {
    /// The inverse gate.
    pub fn adjoint(&self) -> Gate {
        match *self {
            Gate::Hadamard { .. } | Gate::PauliX { .. } | Gate::PauliZ { .. } | Gate::CNOT { .. } => *self,
            Gate::S { qubit } => Gate::Phase { qubit, phi: -FRAC_PI_2 },
            Gate::RX { qubit, theta } => Gate::RX { qubit, theta: -theta },
            Gate::RY { qubit, theta } => Gate::RY { qubit, theta: -theta },
            Gate::RZ { qubit, theta } => Gate::RZ { qubit, theta: -theta },
            Gate::Phase { qubit, phi } => Gate::Phase { qubit, phi: -phi },
        }
    }
}

/// An ordered gate sequence on a fixed-size register.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Circuit {
    num_qubits: usize,
    gates: Vec<Gate>,
}

impl Circuit {
    pub fn new(num_qubits: usize) -> Self {
        Self {
            num_qubits,
            gates: Vec::new(),
        }
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    pub fn push(&mut self, gate: Gate) {
        self.gates.push(gate);
    }

    /// Append every gate of `other` after the current ones.
    pub fn append(&mut self, other: &Circuit) {
        self.gates.extend_from_slice(&other.gates);
    }

    /// The inverse circuit: reversed order, each gate inverted.
    pub fn adjoint(&self) -> Circuit {
        Circuit {
            num_qubits: self.num_qubits,
            gates: self.gates.iter().rev().map(Gate::adjoint).collect(),
        }
    }
}
