//! YAML run configuration.
//!
//! ```yaml
//! system:
//!   kind: explicit
//!   h1e: [[-1.0, 0.0], [0.0, -0.5]]
//!   cholesky:
//!     - [[0.4, 0.0], [0.0, 0.2]]
//!   enuc: 0.3
//!   num_electrons: 1
//! params:
//!   n_walkers: 20
//!   n_steps: 50
//!   dtau: 0.01
//!   quantum_times: [0.1, 0.2]
//! ```

use std::path::Path;

use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{AfqmcError, Result};
use crate::sampling::AFQMCParams;
use crate::systems::{hartree_fock_trial, CholeskyHamiltonian, ModelSystem};

/// Physical system of a run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SystemConfig {
    /// One of the built-in model systems
    Preset { name: String },
    /// Spin-orbital integrals given in full
    Explicit {
        h1e: Vec<Vec<f64>>,
        cholesky: Vec<Vec<Vec<f64>>>,
        #[serde(default)]
        enuc: f64,
        num_electrons: usize,
        /// Real trial orbitals (spin-orbitals × electrons); Hartree-Fock when absent
        #[serde(default)]
        trial: Option<Vec<Vec<f64>>>,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub system: SystemConfig,
    #[serde(default)]
    pub params: AFQMCParams,
}

fn to_matrix(rows: &[Vec<f64>], context: &'static str) -> Result<DMatrix<f64>> {
    let nrows = rows.len();
    let ncols = rows.first().map_or(0, Vec::len);
    if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
        return Err(AfqmcError::DimensionMismatch {
            context,
            expected: ncols,
            actual: bad.len(),
        });
    }
    Ok(DMatrix::from_fn(nrows, ncols, |i, j| rows[i][j]))
}

impl SystemConfig {
    /// Build the Hamiltonian and the trial orbitals. `decimals` is the
    /// diagonal tolerance for the Cholesky eigenbases of explicit systems.
    pub fn build(&self, decimals: u32) -> Result<(CholeskyHamiltonian, DMatrix<Complex64>)> {
        match self {
            SystemConfig::Preset { name } => {
                let system = ModelSystem::by_name(name)?;
                Ok((system.hamiltonian, system.trial))
            }
            SystemConfig::Explicit {
                h1e,
                cholesky,
                enuc,
                num_electrons,
                trial,
            } => {
                let h1e = to_matrix(h1e, "h1e rows")?;
                let cholesky = cholesky
                    .iter()
                    .map(|l| to_matrix(l, "cholesky rows"))
                    .collect::<Result<Vec<_>>>()?;
                let trial = match trial {
                    Some(rows) => to_matrix(rows, "trial rows")?.map(|x| Complex64::new(x, 0.0)),
                    None => hartree_fock_trial(h1e.nrows(), *num_electrons),
                };
                if trial.ncols() != *num_electrons {
                    return Err(AfqmcError::DimensionMismatch {
                        context: "trial electrons",
                        expected: *num_electrons,
                        actual: trial.ncols(),
                    });
                }
                let hamiltonian = CholeskyHamiltonian::with_decimals(h1e, cholesky, *enuc, &trial, decimals)?;
                Ok((hamiltonian, trial))
            }
        }
    }
}

/// Parse a run configuration from YAML text.
pub fn parse_run_config(text: &str) -> Result<RunConfig> {
    Ok(serde_yaml::from_str(text)?)
}

/// Read a run configuration from a YAML file.
pub fn read_run_config<P: AsRef<Path>>(filename: P) -> Result<RunConfig> {
    let file = std::fs::File::open(filename)?;
    let reader = std::io::BufReader::new(file);
    Ok(serde_yaml::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::PropagationMode;
    use approx::assert_relative_eq;

    #[test]
    fn test_explicit_system() {
        let text = r#"
system:
  kind: explicit
  h1e: [[-1.0, 0.0], [0.0, -0.5]]
  cholesky:
    - [[0.4, 0.0], [0.0, 0.2]]
    - [[0.0, 0.1], [0.1, 0.0]]
  enuc: 0.3
  num_electrons: 1
params:
  n_walkers: 4
  n_steps: 5
  dtau: 0.01
  quantum_times: [0.01, 0.03]
  seed: 7
"#;
        let config = parse_run_config(text).unwrap();
        assert_eq!(config.params.n_walkers, 4);
        assert_eq!(config.params.seed, Some(7));
        assert_eq!(config.params.mode, PropagationMode::Hybrid);

        let (ham, trial) = config.system.build(config.params.diagonal_decimals).unwrap();
        assert_eq!(trial.shape(), (2, 1));
        assert_eq!(ham.num_fields(), 2);
        assert_relative_eq!(ham.e_hf, -0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_preset_system_with_default_params() {
        let config = parse_run_config("system:\n  kind: preset\n  name: four_orbital\n").unwrap();
        assert_eq!(config.params, AFQMCParams::default());
        let (ham, _) = config.system.build(config.params.diagonal_decimals).unwrap();
        assert_eq!(ham.num_spin_orbitals, 4);
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let config = SystemConfig::Explicit {
            h1e: vec![vec![-1.0, 0.0], vec![0.0]],
            cholesky: vec![],
            enuc: 0.0,
            num_electrons: 1,
            trial: None,
        };
        assert!(matches!(config.build(7), Err(AfqmcError::DimensionMismatch { .. })));
        assert!(matches!(read_run_config("does-not-exist.yml"), Err(AfqmcError::Io(_))));
    }
}
