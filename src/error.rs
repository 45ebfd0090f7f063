//! Error types for the AFQMC driver and its quantum device layer.

use thiserror::Error;

/// Errors raised by a quantum execution backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    /// Gate addresses a qubit outside the register
    #[error("Invalid qubit index {index} for {num_qubits}-qubit circuit")]
    InvalidQubitIndex { index: usize, num_qubits: usize },

    /// Register is larger than the backend can hold
    #[error("Circuit requires {requested} qubits, backend supports max {max}")]
    TooManyQubits { requested: usize, max: usize },

    /// Two-qubit gate with identical control and target
    #[error("Control and target coincide on qubit {qubit}")]
    RepeatedQubit { qubit: usize },

    /// Shot-based backend configured with zero shots
    #[error("Shot-based execution requires at least one shot")]
    NoShots,

    /// Sampling from the outcome distribution failed
    #[error("Sampling failed: {0}")]
    Sampling(String),
}

/// Errors raised while setting up or running an AFQMC calculation.
#[derive(Error, Debug)]
pub enum AfqmcError {
    /// Matrix or vector shapes are inconsistent
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Run parameters or system description are invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// ⟨trial|walker⟩ is singular in the classical estimator
    #[error("Overlap matrix between trial and walker is singular")]
    SingularOverlap,

    /// A ratio or normalisation denominator fell below tolerance
    #[error("Vanishing overlap at step {step}: |denominator| = {magnitude:e}")]
    VanishingOverlap { step: usize, magnitude: f64 },

    /// Every walker died, so the ensemble average is undefined
    #[error("Walker population is empty at step {step}")]
    EmptyPopulation { step: usize },

    /// Quantum device call failed; the whole step is aborted
    #[error("Device failure: {0}")]
    Device(#[from] DeviceError),

    /// Worker pool could not be created
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for AFQMC operations
pub type Result<T> = std::result::Result<T, AfqmcError>;
