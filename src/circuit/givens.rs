//! Givens-rotation synthesis of single-particle basis rotations.
//!
//! A unitary U on N spin-orbitals is reduced to a diagonal of phases by
//! nearest-neighbour rotations acting on rows (i, i+1):
//!
//!   G_K ··· G_1 U = D,   G_k = R(θ_k) · diag(e^{iφ_k}, 1)
//!
//! so that U = G_1† ··· G_K† D. Both factors are fermionic Gaussian gates, which
//! makes the resulting circuit act on every Slater determinant as the orbital
//! rotation a†_q → Σ_p U_pq a†_p while leaving the vacuum untouched.

use nalgebra::DMatrix;
use num_complex::Complex64;

use super::gate::{Circuit, Gate};

const ROTATION_EPS: f64 = 1e-14;

/// One nearest-neighbour rotation R(θ)·diag(e^{iφ}, 1) on modes (i, j = i + 1).
///
/// `theta` is the RY angle, so R(θ) = [[cos θ/2, sin θ/2], [-sin θ/2, cos θ/2]].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GivensRotation {
    pub i: usize,
    pub j: usize,
    pub theta: f64,
    pub phi: f64,
}

fn rotate_rows(w: &mut DMatrix<Complex64>, rot: &GivensRotation) {
    let (s, c) = (0.5 * rot.theta).sin_cos();
    let phase = Complex64::from_polar(1.0, rot.phi);
    for k in 0..w.ncols() {
        let xa = phase * w[(rot.i, k)];
        let xb = w[(rot.j, k)];
        w[(rot.i, k)] = xa * c + xb * s;
        w[(rot.j, k)] = xb * c - xa * s;
    }
}

/// Decompose a square unitary into nearest-neighbour rotations and a phase diagonal.
///
/// Rotations are returned in the order they are applied during elimination.
pub fn givens_decomposition(u: &DMatrix<Complex64>) -> (Vec<GivensRotation>, Vec<Complex64>) {
    let n = u.nrows();
    let mut w = u.clone();
    let mut rotations = Vec::new();

    for col in 0..n.saturating_sub(1) {
        for row in (col + 1..n).rev() {
            let xa = w[(row - 1, col)];
            let xb = w[(row, col)];
            if xb.norm() < ROTATION_EPS {
                continue;
            }
            let rot = GivensRotation {
                i: row - 1,
                j: row,
                theta: 2.0 * xb.norm().atan2(xa.norm()),
                phi: xb.arg() - xa.arg(),
            };
            rotate_rows(&mut w, &rot);
            rotations.push(rot);
        }
    }

    let diagonal = (0..n).map(|p| w[(p, p)]).collect();
    (rotations, diagonal)
}

/// Real rotation R(θ) on adjacent modes: CNOT, controlled-RY, CNOT.
fn push_real_rotation(circuit: &mut Circuit, a: usize, b: usize, theta: f64) {
    circuit.push(Gate::CNOT { control: a, target: b });
    // controlled-RY(θ) with control b, target a
    circuit.push(Gate::RY { qubit: a, theta: 0.5 * theta });
    circuit.push(Gate::CNOT { control: b, target: a });
    circuit.push(Gate::RY { qubit: a, theta: -0.5 * theta });
    circuit.push(Gate::CNOT { control: b, target: a });
    circuit.push(Gate::CNOT { control: a, target: b });
}

/// Circuit implementing the single-particle rotation `u` on `u.nrows()` qubits.
pub fn orbital_rotation(u: &DMatrix<Complex64>) -> Circuit {
    let n = u.nrows();
    let (rotations, diagonal) = givens_decomposition(u);
    let mut circuit = Circuit::new(n);

    for (qubit, d) in diagonal.iter().enumerate() {
        let phi = d.arg();
        if phi.abs() > ROTATION_EPS {
            circuit.push(Gate::Phase { qubit, phi });
        }
    }

    // G_k† = diag(e^{-iφ}, 1) · R(-θ), applied from G_K† down to G_1†
    for rot in rotations.iter().rev() {
        push_real_rotation(&mut circuit, rot.i, rot.j, -rot.theta);
        if rot.phi.abs() > ROTATION_EPS {
            circuit.push(Gate::Phase { qubit: rot.i, phi: -rot.phi });
        }
    }

    circuit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::StateVector;
    use crate::linalg::reortho;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn random_unitary(n: usize, data: &[f64]) -> DMatrix<Complex64> {
        let mut a = DMatrix::from_fn(n, n, |i, j| {
            let k = 2 * (i * n + j);
            Complex64::new(data[k], data[k + 1])
        });
        for k in 0..n {
            a[(k, k)] += Complex64::new(1.5, 0.0);
        }
        reortho(&a).0
    }

    fn basis_index(n: usize, occupied: &[usize]) -> usize {
        occupied.iter().map(|&q| 1usize << (n - 1 - q)).sum()
    }

    #[test]
    fn test_decomposition_reconstructs_unitary() {
        let data: Vec<f64> = (0..32).map(|k| ((k as f64) * 0.37).sin()).collect();
        let u = random_unitary(4, &data);
        let (rotations, diagonal) = givens_decomposition(&u);
        assert_eq!(rotations.len(), 6);

        let mut w = u.clone();
        for rot in &rotations {
            rotate_rows(&mut w, rot);
        }
        for i in 0..4 {
            for j in 0..4 {
                let expected = if i == j { diagonal[i] } else { Complex64::new(0.0, 0.0) };
                assert_relative_eq!((w[(i, j)] - expected).norm(), 0.0, epsilon = 1e-12);
            }
            assert_relative_eq!(diagonal[i].norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_identity_needs_no_gates() {
        let u = DMatrix::<Complex64>::identity(3, 3);
        assert!(orbital_rotation(&u).is_empty());
    }

    proptest! {
        #[test]
        fn test_single_particle_action(data in proptest::collection::vec(-1.0f64..1.0, 32)) {
            let n = 4;
            let u = random_unitary(n, &data);
            let circuit = orbital_rotation(&u);

            let vacuum = StateVector::from_basis_state(n, 0).run(&circuit).unwrap();
            prop_assert!((vacuum.amplitudes()[0] - Complex64::new(1.0, 0.0)).norm() < 1e-10);

            for q in 0..n {
                let state = StateVector::from_basis_state(n, basis_index(n, &[q])).run(&circuit).unwrap();
                for p in 0..n {
                    let amp = state.amplitudes()[basis_index(n, &[p])];
                    prop_assert!((amp - u[(p, q)]).norm() < 1e-10);
                }
            }
        }
    }

    #[test]
    fn test_two_particle_action_is_minor_determinant() {
        let n = 4;
        let data: Vec<f64> = (0..32).map(|k| ((k as f64) * 1.13 + 0.2).cos()).collect();
        let u = random_unitary(n, &data);
        let circuit = orbital_rotation(&u);
        let state = StateVector::from_basis_state(n, basis_index(n, &[0, 1])).run(&circuit).unwrap();

        for p in 0..n {
            for r in (p + 1)..n {
                let minor = u[(p, 0)] * u[(r, 1)] - u[(r, 0)] * u[(p, 1)];
                let amp = state.amplitudes()[basis_index(n, &[p, r])];
                assert_relative_eq!((amp - minor).norm(), 0.0, epsilon = 1e-10);
            }
        }
    }
}
