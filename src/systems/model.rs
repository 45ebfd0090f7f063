//! Small model systems with known structure, used by the binary's presets
//! and the end-to-end tests.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use super::hamiltonian::CholeskyHamiltonian;
use crate::error::{AfqmcError, Result};
use crate::linalg::reortho;

/// A Hamiltonian together with its trial determinant.
#[derive(Debug, Clone)]
pub struct ModelSystem {
    pub name: &'static str,
    pub hamiltonian: CholeskyHamiltonian,
    pub trial: DMatrix<Complex64>,
}

/// Lowest `num_electrons` spin-orbitals occupied.
pub fn hartree_fock_trial(num_spin_orbitals: usize, num_electrons: usize) -> DMatrix<Complex64> {
    DMatrix::from_fn(num_spin_orbitals, num_electrons, |i, j| {
        Complex64::new(if i == j { 1.0 } else { 0.0 }, 0.0)
    })
}

impl ModelSystem {
    /// One electron on two sites. The Hamiltonian is diagonal in the site
    /// basis, so every walker has local energy h_00 + E_nuc = -0.7.
    pub fn two_site() -> Result<Self> {
        let h1 = DMatrix::from_diagonal(&DVector::from_vec(vec![-1.0, -0.5]));
        let cholesky = vec![
            DMatrix::from_diagonal(&DVector::from_vec(vec![0.4, 0.2])),
            DMatrix::from_row_slice(2, 2, &[0.0, 0.1, 0.1, 0.0]),
        ];
        let trial = hartree_fock_trial(2, 1);
        let hamiltonian = CholeskyHamiltonian::new(h1, cholesky, 0.3, &trial)?;
        Ok(Self {
            name: "two_site",
            hamiltonian,
            trial,
        })
    }

    /// Two electrons in four spin-orbitals with non-diagonal factors. The
    /// one-electron matrix absorbs ½ Σ_γ L_γ² so that h_chem stays diagonal.
    pub fn four_orbital() -> Result<Self> {
        let cholesky = vec![
            DMatrix::from_diagonal(&DVector::from_vec(vec![0.5, 0.3, -0.2, 0.1])),
            DMatrix::from_row_slice(
                4,
                4,
                &[
                    0.1, 0.2, 0.0, 0.1, //
                    0.2, 0.0, 0.15, 0.0, //
                    0.0, 0.15, -0.1, 0.05, //
                    0.1, 0.0, 0.05, 0.0,
                ],
            ),
            DMatrix::from_row_slice(
                4,
                4,
                &[
                    0.0, 0.0, 0.12, 0.0, //
                    0.0, 0.05, 0.0, 0.08, //
                    0.12, 0.0, 0.0, 0.0, //
                    0.0, 0.08, 0.0, 0.2,
                ],
            ),
        ];
        let mut h1 = DMatrix::from_diagonal(&DVector::from_vec(vec![-1.2, -0.9, 0.3, 0.6]));
        for l in &cholesky {
            h1 += (l * l).scale(0.5);
        }
        let trial = hartree_fock_trial(4, 2);
        let hamiltonian = CholeskyHamiltonian::new(h1, cholesky, 0.7, &trial)?;
        Ok(Self {
            name: "four_orbital",
            hamiltonian,
            trial,
        })
    }

    pub fn by_name(name: &str) -> Result<Self> {
        match name {
            "two_site" => Self::two_site(),
            "four_orbital" => Self::four_orbital(),
            other => Err(AfqmcError::InvalidConfig(format!("unknown model system '{}'", other))),
        }
    }

    /// Orthonormalised trial plus a fixed complex perturbation of size `eps`.
    pub fn perturbed_walker(&self, eps: f64) -> DMatrix<Complex64> {
        let perturbation = DMatrix::from_fn(self.trial.nrows(), self.trial.ncols(), |i, j| {
            let t = 1.0 + i as f64 + 2.0 * j as f64;
            Complex64::new(t.sin(), 0.5 * t.cos())
        });
        reortho(&(&self.trial + perturbation * Complex64::new(eps, 0.0))).0
    }
}
