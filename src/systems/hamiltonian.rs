//! Cholesky-factorised electronic Hamiltonian in a spin-orbital basis.
//!
//! With two-electron integrals (pq|rs) = Σ_γ L^γ_pq L^γ_rs the Hamiltonian is
//!
//!   H = Σ_pq (h_chem)_pq a†_p a_q + ½ Σ_γ L̂_γ² + E_nuc,   h_chem = h − ½ Σ_γ L_γ²
//!
//! Subtracting the trial mean field l̄_γ = ⟨L̂_γ⟩_T from every factor leaves the
//! one-body propagator v_0 = h_chem + Σ_γ l̄_γ L_γ and the fluctuation operators
//! v_γ = i L_γ with mean-field shift i l̄_γ.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use crate::error::{AfqmcError, Result};
use crate::estimator::DIAGONAL_DECIMALS;
use crate::linalg::is_diagonal;
use crate::sampling::{classical, EnergyCalculator};

const SYMMETRY_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct CholeskyHamiltonian {
    pub num_spin_orbitals: usize,
    pub num_electrons: usize,
    /// One-electron integrals h_pq
    pub h1e: DMatrix<Complex64>,
    /// (pq|rs) stored at row p·n + q, column r·n + s
    pub eri: DMatrix<f64>,
    pub enuc: f64,
    pub cholesky: Vec<DMatrix<Complex64>>,
    pub h_chem: DMatrix<Complex64>,
    pub v_0: DMatrix<Complex64>,
    pub v_gamma: Vec<DMatrix<Complex64>>,
    pub mf_shift: DVector<Complex64>,
    /// Eigenvalues of each Cholesky factor
    pub lambda_l: Vec<DVector<f64>>,
    /// Eigenvectors of each Cholesky factor (columns)
    pub u_l: Vec<DMatrix<Complex64>>,
    /// Local energy of the trial determinant with itself
    pub e_hf: f64,
}

fn to_complex(m: &DMatrix<f64>) -> DMatrix<Complex64> {
    m.map(|x| Complex64::new(x, 0.0))
}

fn check_square(m: &DMatrix<f64>, n: usize, context: &'static str) -> Result<()> {
    if m.nrows() != n || m.ncols() != n {
        return Err(AfqmcError::DimensionMismatch {
            context,
            expected: n,
            actual: if m.nrows() != n { m.nrows() } else { m.ncols() },
        });
    }
    if (m - m.transpose()).amax() > SYMMETRY_TOLERANCE {
        return Err(AfqmcError::InvalidConfig(format!("{} must be symmetric", context)));
    }
    Ok(())
}

/// Eigenvalues and eigenvectors of a real symmetric factor; factors diagonal
/// to `decimals` places keep their own ordering with an identity eigenbasis.
fn factor_eigenbasis(l: &DMatrix<Complex64>, decimals: u32) -> (DVector<f64>, DMatrix<Complex64>) {
    let n = l.nrows();
    if is_diagonal(l, decimals) {
        let lambda = DVector::from_iterator(n, (0..n).map(|i| l[(i, i)].re));
        (lambda, DMatrix::identity(n, n))
    } else {
        let eigen = l.clone().symmetric_eigen();
        (eigen.eigenvalues, eigen.eigenvectors)
    }
}

impl CholeskyHamiltonian {
    /// Build every derived operator from the one-electron matrix, the
    /// Cholesky factors of the two-electron integrals and the trial orbitals
    /// (spin-orbitals × electrons).
    pub fn new(
        h1e: DMatrix<f64>,
        cholesky: Vec<DMatrix<f64>>,
        enuc: f64,
        trial: &DMatrix<Complex64>,
    ) -> Result<Self> {
        Self::with_decimals(h1e, cholesky, enuc, trial, DIAGONAL_DECIMALS)
    }

    /// Like [`CholeskyHamiltonian::new`], treating a factor as diagonal when its
    /// off-diagonal entries vanish to `decimals` places.
    pub fn with_decimals(
        h1e: DMatrix<f64>,
        cholesky: Vec<DMatrix<f64>>,
        enuc: f64,
        trial: &DMatrix<Complex64>,
        decimals: u32,
    ) -> Result<Self> {
        let n = h1e.nrows();
        check_square(&h1e, n, "one-electron integrals")?;
        for l in &cholesky {
            check_square(l, n, "cholesky factor")?;
        }
        if trial.nrows() != n {
            return Err(AfqmcError::DimensionMismatch {
                context: "trial spin-orbitals",
                expected: n,
                actual: trial.nrows(),
            });
        }
        let num_electrons = trial.ncols();
        if num_electrons == 0 || num_electrons > n {
            return Err(AfqmcError::InvalidConfig(format!(
                "{} electrons in {} spin-orbitals",
                num_electrons, n
            )));
        }

        let mut eri = DMatrix::zeros(n * n, n * n);
        for l in &cholesky {
            let flat = DVector::from_iterator(n * n, (0..n * n).map(|k| l[(k / n, k % n)]));
            eri += &flat * flat.transpose();
        }

        let h1e = to_complex(&h1e);
        let cholesky: Vec<_> = cholesky.iter().map(to_complex).collect();

        let mut h_chem = h1e.clone();
        for l in &cholesky {
            h_chem -= (l * l).scale(0.5);
        }

        let g_trial = classical::greens_function(trial, trial)?;
        let l_bar: Vec<Complex64> = cholesky.iter().map(|l| l.component_mul(&g_trial).sum()).collect();

        let mut v_0 = h_chem.clone();
        for (l, bar) in cholesky.iter().zip(&l_bar) {
            v_0 += l * *bar;
        }
        let v_gamma = cholesky.iter().map(|l| l * Complex64::i()).collect();
        let mf_shift = DVector::from_iterator(l_bar.len(), l_bar.iter().map(|bar| Complex64::i() * bar));

        let (lambda_l, u_l) = cholesky.iter().map(|l| factor_eigenbasis(l, decimals)).unzip();

        let mut ham = Self {
            num_spin_orbitals: n,
            num_electrons,
            h1e,
            eri,
            enuc,
            cholesky,
            h_chem,
            v_0,
            v_gamma,
            mf_shift,
            lambda_l,
            u_l,
            e_hf: 0.0,
        };
        ham.e_hf = ham.local_energy(&g_trial).re;
        Ok(ham)
    }

    pub fn num_fields(&self) -> usize {
        self.cholesky.len()
    }

    /// (pq|rs)
    pub fn eri_element(&self, p: usize, q: usize, r: usize, s: usize) -> f64 {
        let n = self.num_spin_orbitals;
        self.eri[(p * n + q, r * n + s)]
    }

    /// Whether h_chem is diagonal, which the quantum local-energy estimator requires.
    pub fn has_diagonal_one_body(&self, decimals: u32) -> bool {
        is_diagonal(&self.h_chem, decimals)
    }
}

impl EnergyCalculator for CholeskyHamiltonian {
    fn local_energy(&self, green: &DMatrix<Complex64>) -> Complex64 {
        classical::local_energy(&self.h1e, &self.eri, green, self.enuc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn hf_trial(n: usize, ne: usize) -> DMatrix<Complex64> {
        DMatrix::from_fn(n, ne, |i, j| Complex64::new(if i == j { 1.0 } else { 0.0 }, 0.0))
    }

    fn factors() -> Vec<DMatrix<f64>> {
        vec![
            DMatrix::from_diagonal(&DVector::from_vec(vec![0.4, 0.2, -0.1])),
            DMatrix::from_row_slice(3, 3, &[0.0, 0.1, 0.0, 0.1, 0.0, 0.3, 0.0, 0.3, 0.2]),
        ]
    }

    #[test]
    fn test_eri_from_cholesky() {
        let h1 = DMatrix::from_diagonal(&DVector::from_vec(vec![-1.0, -0.5, 0.2]));
        let ham = CholeskyHamiltonian::new(h1, factors(), 0.0, &hf_trial(3, 1)).unwrap();
        let l = factors();
        for (p, q, r, s) in [(0, 0, 0, 0), (0, 1, 1, 0), (1, 2, 2, 2), (1, 2, 0, 0)] {
            let expected: f64 = l.iter().map(|f| f[(p, q)] * f[(r, s)]).sum();
            assert_relative_eq!(ham.eri_element(p, q, r, s), expected, epsilon = 1e-14);
        }
        assert_relative_eq!(ham.eri_element(1, 2, 2, 1), ham.eri_element(2, 1, 1, 2), epsilon = 1e-14);
    }

    #[test]
    fn test_derived_operators() {
        let h1 = DMatrix::from_diagonal(&DVector::from_vec(vec![-1.0, -0.5, 0.2]));
        let ham = CholeskyHamiltonian::new(h1, factors(), 0.5, &hf_trial(3, 1)).unwrap();

        // trial occupies orbital 0: l̄ = (0.4, 0.0)
        assert_relative_eq!(ham.mf_shift[0].im, 0.4, epsilon = 1e-14);
        assert_relative_eq!(ham.mf_shift[1].norm(), 0.0, epsilon = 1e-14);
        assert_relative_eq!(ham.v_gamma[1][(1, 2)].im, 0.3, epsilon = 1e-14);

        // h_chem_00 = -1 - ½(0.16 + 0.01)
        assert_relative_eq!(ham.h_chem[(0, 0)].re, -1.085, epsilon = 1e-14);
        assert_relative_eq!(ham.v_0[(0, 0)].re, -1.085 + 0.16, epsilon = 1e-14);

        // diagonal factor keeps its order and an identity basis
        assert_eq!(ham.lambda_l[0].as_slice(), &[0.4, 0.2, -0.1]);
        assert!(is_diagonal(&ham.u_l[0], 7));

        // rotated factor: U diag(λ) U† = L
        let rebuilt = &ham.u_l[1] * DMatrix::from_diagonal(&ham.lambda_l[1].map(|x| Complex64::new(x, 0.0)))
            * ham.u_l[1].adjoint();
        assert_relative_eq!((rebuilt - &ham.cholesky[1]).norm(), 0.0, epsilon = 1e-10);

        // one electron: no two-body energy
        assert_relative_eq!(ham.e_hf, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_diagonal_tolerance_selects_eigenbasis() {
        let h1 = DMatrix::from_diagonal(&DVector::from_vec(vec![-1.0, -0.5]));
        let nearly_diagonal = vec![DMatrix::from_row_slice(2, 2, &[0.3, 1e-9, 1e-9, 0.1])];

        let coarse = CholeskyHamiltonian::with_decimals(h1.clone(), nearly_diagonal.clone(), 0.0, &hf_trial(2, 1), 7)
            .unwrap();
        assert_eq!(coarse.lambda_l[0].as_slice(), &[0.3, 0.1]);
        assert_eq!(coarse.u_l[0], DMatrix::identity(2, 2));

        let fine = CholeskyHamiltonian::with_decimals(h1, nearly_diagonal, 0.0, &hf_trial(2, 1), 12).unwrap();
        assert!(!is_diagonal(&fine.u_l[0], 12));
        let rebuilt = &fine.u_l[0] * DMatrix::from_diagonal(&fine.lambda_l[0].map(|x| Complex64::new(x, 0.0)))
            * fine.u_l[0].adjoint();
        assert_relative_eq!((rebuilt - &fine.cholesky[0]).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_bad_input() {
        let h1 = DMatrix::from_diagonal(&DVector::from_vec(vec![-1.0, -0.5]));
        let asym = vec![DMatrix::from_row_slice(2, 2, &[0.0, 0.1, 0.2, 0.0])];
        assert!(matches!(
            CholeskyHamiltonian::new(h1.clone(), asym, 0.0, &hf_trial(2, 1)),
            Err(AfqmcError::InvalidConfig(_))
        ));
        assert!(matches!(
            CholeskyHamiltonian::new(h1, vec![], 0.0, &hf_trial(3, 1)),
            Err(AfqmcError::DimensionMismatch { .. })
        ));
    }
}
