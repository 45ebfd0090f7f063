//! Linear-algebra helpers shared by the estimators and the propagators.

mod orthogonal;

pub use orthogonal::{complete_unitary, is_diagonal, is_identity, reortho};
