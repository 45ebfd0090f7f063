//! Circuit module - gate sequences, Givens-rotation synthesis and trial states.
//!
//! Qubit `p` carries the occupation of spin-orbital `p` (Jordan-Wigner), and
//! qubit 0 is the most significant bit of a computational-basis index.

mod gate;
mod givens;
mod trial;

pub use gate::{Circuit, Gate};
pub use givens::{givens_decomposition, orbital_rotation, GivensRotation};
pub use trial::{SlaterTrialCircuit, TrialState};
