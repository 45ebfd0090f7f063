//! Systems module - Hamiltonians and model systems for AFQMC.

mod hamiltonian;
mod model;

pub use hamiltonian::CholeskyHamiltonian;
pub use model::{hartree_fock_trial, ModelSystem};
