//! Population controller for hybrid quantum-classical AFQMC.
//!
//! Every time step dispatches one step driver per live walker on a rayon
//! pool and waits for all of them before the ensemble energy, the energy
//! shift and the surviving population are formed. At quantum checkpoints the
//! walkers additionally report a quantum energy that is combined with the
//! weighted ratio estimator
//!
//!   E_Q = Re( Σ_i w_i E_Q,i / Σ_i w_i ⟨Ψ_Q|φ_i⟩/⟨Ψ_T|φ_i⟩ )

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info, warn};
use nalgebra::DMatrix;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use super::classical::imag_time_propagator;
use super::metrics::LogMetrics;
use super::propagator::{imag_time_propagator_qaee, q_imag_time_propagator};
use super::step::StepContext;
use super::traits::MetricsSink;
use crate::circuit::TrialState;
use crate::device::QuantumDevice;
use crate::error::{AfqmcError, Result};
use crate::estimator::amplitude_estimate;
use crate::systems::CholeskyHamiltonian;

/// Which step driver moves the walkers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PropagationMode {
    /// Classical dynamics; quantum energy readout at checkpoints only
    #[default]
    Hybrid,
    /// Quantum estimates drive every step
    FullyQuantum,
}

/// Parameters for an AFQMC run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AFQMCParams {
    pub n_walkers: usize,
    pub n_steps: usize,
    pub dtau: f64,
    /// Imaginary times (4 decimals) at which the quantum energy is evaluated
    pub quantum_times: Vec<f64>,
    /// Worker threads per step
    pub max_pool: usize,
    pub mode: PropagationMode,
    /// Seed of the run-level generator; OS entropy when absent
    pub seed: Option<u64>,
    pub weight_threshold: f64,
    pub overlap_tolerance: f64,
    pub diagonal_decimals: u32,
    pub progress: bool,
}

impl Default for AFQMCParams {
    fn default() -> Self {
        Self {
            n_walkers: 100,
            n_steps: 100,
            dtau: 0.005,
            quantum_times: Vec::new(),
            max_pool: 4,
            mode: PropagationMode::Hybrid,
            seed: None,
            weight_threshold: 1e-16,
            overlap_tolerance: 1e-12,
            diagonal_decimals: 7,
            progress: true,
        }
    }
}

impl AFQMCParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_n_walkers(mut self, n: usize) -> Self {
        self.n_walkers = n;
        self
    }

    pub fn with_n_steps(mut self, n: usize) -> Self {
        self.n_steps = n;
        self
    }

    pub fn with_dtau(mut self, dtau: f64) -> Self {
        self.dtau = dtau;
        self
    }

    pub fn with_quantum_times(mut self, times: Vec<f64>) -> Self {
        self.quantum_times = times;
        self
    }

    pub fn with_max_pool(mut self, max_pool: usize) -> Self {
        self.max_pool = max_pool;
        self
    }

    pub fn with_mode(mut self, mode: PropagationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }
}

/// Quantum energy estimate recorded at one step.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct QuantumEnergy {
    pub step: usize,
    pub time: f64,
    pub energy: f64,
}

/// Results of an AFQMC run.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct AFQMCResults {
    /// Imaginary time of each step
    pub times: Vec<f64>,
    /// Ensemble energy of each step
    pub energies: Vec<f64>,
    /// Sparse quantum energy trace
    pub quantum_energies: Vec<QuantumEnergy>,
    /// Live walkers at the start of each step
    pub populations: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
struct Population {
    walkers: Vec<DMatrix<Complex64>>,
    weights: Vec<f64>,
    /// Quantum overlaps carried between fully quantum steps; empty otherwise
    overlaps: Vec<Complex64>,
}

impl Population {
    fn len(&self) -> usize {
        self.walkers.len()
    }

    fn is_empty(&self) -> bool {
        self.walkers.is_empty()
    }
}

/// Keep the (walker, weight, overlap) triples whose weight exceeds `threshold`.
fn prune<I>(candidates: I, threshold: f64) -> Population
where
    I: IntoIterator<Item = (DMatrix<Complex64>, f64, Option<Complex64>)>,
{
    let mut population = Population::default();
    for (walker, weight, ovlp) in candidates {
        if weight > threshold {
            population.walkers.push(walker);
            population.weights.push(weight);
            population.overlaps.extend(ovlp);
        }
    }
    population
}

/// Checkpoint key: imaginary time rounded to 4 decimals.
pub fn time_key(time: f64) -> i64 {
    (time * 1e4).round() as i64
}

/// Re(Σ w_i E_i / Σ w_i)
pub fn weighted_energy(weights: &[f64], energies: &[Complex64], step: usize) -> Result<f64> {
    let total: f64 = weights.iter().sum();
    if weights.is_empty() || total <= 0.0 {
        return Err(AfqmcError::EmptyPopulation { step });
    }
    let sum: Complex64 = weights.iter().zip(energies).map(|(&w, &e)| w * e).sum();
    Ok((sum / total).re)
}

/// Re(Σ w_i N_i / Σ w_i D_i), rejecting a weight-averaged denominator
/// |Σ w_i D_i| / Σ w_i below `tolerance`.
pub fn ratio_energy(
    weights: &[f64],
    numerators: &[Complex64],
    denominators: &[Complex64],
    tolerance: f64,
    step: usize,
) -> Result<f64> {
    let total: f64 = weights.iter().sum();
    if weights.is_empty() || total <= 0.0 {
        return Err(AfqmcError::EmptyPopulation { step });
    }
    let numerator: Complex64 = weights.iter().zip(numerators).map(|(&w, &n)| w / total * n).sum();
    let denominator: Complex64 = weights.iter().zip(denominators).map(|(&w, &d)| w / total * d).sum();
    if denominator.norm() < tolerance {
        return Err(AfqmcError::VanishingOverlap {
            step,
            magnitude: denominator.norm(),
        });
    }
    Ok((numerator / denominator).re)
}

/// Energies produced by one time step.
struct StepOutcome {
    energy: f64,
    quantum_energy: Option<f64>,
    next: Population,
}

/// AFQMC simulation engine.
pub struct AFQMCSimulation {
    hamiltonian: CholeskyHamiltonian,
    trial: DMatrix<Complex64>,
    trial_state: Box<dyn TrialState>,
    device: Box<dyn QuantumDevice>,
    params: AFQMCParams,
    metrics: Arc<dyn MetricsSink>,
}

impl AFQMCSimulation {
    pub fn new(
        hamiltonian: CholeskyHamiltonian,
        trial: DMatrix<Complex64>,
        trial_state: Box<dyn TrialState>,
        device: Box<dyn QuantumDevice>,
        params: AFQMCParams,
    ) -> Self {
        Self {
            hamiltonian,
            trial,
            trial_state,
            device,
            params,
            metrics: Arc::new(LogMetrics),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    fn validate(&self) -> Result<()> {
        let p = &self.params;
        if p.n_walkers == 0 {
            return Err(AfqmcError::InvalidConfig("n_walkers must be positive".into()));
        }
        if !(p.dtau > 0.0 && p.dtau.is_finite()) {
            return Err(AfqmcError::InvalidConfig(format!("dtau must be positive, got {}", p.dtau)));
        }
        if p.max_pool == 0 {
            return Err(AfqmcError::InvalidConfig("max_pool must be positive".into()));
        }
        if self.trial.shape() != (self.hamiltonian.num_spin_orbitals, self.hamiltonian.num_electrons) {
            return Err(AfqmcError::DimensionMismatch {
                context: "trial orbitals",
                expected: self.hamiltonian.num_spin_orbitals,
                actual: self.trial.nrows(),
            });
        }
        let uses_quantum = p.mode == PropagationMode::FullyQuantum || !p.quantum_times.is_empty();
        if uses_quantum && !self.hamiltonian.has_diagonal_one_body(p.diagonal_decimals) {
            return Err(AfqmcError::InvalidConfig(
                "quantum local energy requires a diagonal h_chem".into(),
            ));
        }
        Ok(())
    }

    fn context(&self, step: usize, e_shift: f64) -> StepContext<'_> {
        StepContext {
            hamiltonian: &self.hamiltonian,
            trial: &self.trial,
            trial_state: self.trial_state.as_ref(),
            device: self.device.as_ref(),
            dtau: self.params.dtau,
            e_shift,
            step,
            decimals: self.params.diagonal_decimals,
            overlap_tolerance: self.params.overlap_tolerance,
        }
    }

    fn initial_population(&self) -> Result<Population> {
        let n = self.params.n_walkers;
        let overlaps = match self.params.mode {
            PropagationMode::Hybrid => Vec::new(),
            PropagationMode::FullyQuantum => {
                let ovlp = amplitude_estimate(&self.trial, self.trial_state.as_ref(), self.device.as_ref())?;
                vec![ovlp; n]
            }
        };
        Ok(Population {
            walkers: vec![self.trial.clone(); n],
            weights: vec![1.0; n],
            overlaps,
        })
    }

    /// Run the full simulation.
    pub fn run(&self) -> Result<AFQMCResults> {
        self.validate()?;
        let p = &self.params;
        let pool = ThreadPoolBuilder::new()
            .num_threads(p.max_pool)
            .build()
            .map_err(|e| AfqmcError::ThreadPool(e.to_string()))?;
        let mut master = match p.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let checkpoints: HashSet<i64> = p.quantum_times.iter().map(|&t| time_key(t)).collect();

        info!(
            "AFQMC: {} walkers, {} steps, dtau = {}, mode = {:?}, device = {}",
            p.n_walkers,
            p.n_steps,
            p.dtau,
            p.mode,
            self.device.name()
        );

        let mut population = self.initial_population()?;
        let mut e_shift = self.hamiltonian.e_hf;
        let mut results = AFQMCResults::default();

        for step in 0..p.n_steps {
            if population.is_empty() {
                return Err(AfqmcError::EmptyPopulation { step });
            }
            let time = step as f64 * p.dtau;
            let ctx = self.context(step, e_shift);
            let seeds: Vec<u64> = (0..population.len()).map(|_| master.gen()).collect();

            let outcome = match p.mode {
                PropagationMode::FullyQuantum => self.quantum_step(&pool, &ctx, &population, &seeds)?,
                PropagationMode::Hybrid if checkpoints.contains(&time_key(time)) => {
                    self.hybrid_step(&pool, &ctx, &population, &seeds)?
                }
                PropagationMode::Hybrid => self.classical_step(&pool, &ctx, &population, &seeds)?,
            };

            let dropped = population.len() - outcome.next.len();
            if dropped > 0 {
                warn!("step {}: {} walkers dropped below weight threshold", step, dropped);
            }

            results.times.push(time);
            results.energies.push(outcome.energy);
            results.populations.push(population.len());
            self.metrics.record("cE", outcome.energy, step);
            if let Some(energy) = outcome.quantum_energy {
                results.quantum_energies.push(QuantumEnergy { step, time, energy });
                self.metrics.record("qE", energy, step);
            }
            if p.progress {
                info!(
                    "step {}/{} t = {:.4} E = {:.8} walkers = {}",
                    step + 1,
                    p.n_steps,
                    time,
                    outcome.energy,
                    outcome.next.len()
                );
            }

            e_shift = outcome.energy;
            population = outcome.next;
        }

        Ok(results)
    }

    fn classical_step(
        &self,
        pool: &ThreadPool,
        ctx: &StepContext,
        population: &Population,
        seeds: &[u64],
    ) -> Result<StepOutcome> {
        let steps = pool.install(|| {
            population
                .walkers
                .par_iter()
                .zip(population.weights.par_iter())
                .zip(seeds.par_iter())
                .map(|((walker, &weight), &seed)| {
                    let mut rng = StdRng::seed_from_u64(seed);
                    imag_time_propagator(ctx, walker, weight, &mut rng)
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let energies: Vec<Complex64> = steps.iter().map(|s| s.energy).collect();
        let energy = weighted_energy(&population.weights, &energies, ctx.step)?;
        let next = prune(
            steps.into_iter().map(|s| (s.walker, s.weight, None)),
            self.params.weight_threshold,
        );
        Ok(StepOutcome {
            energy,
            quantum_energy: None,
            next,
        })
    }

    fn hybrid_step(
        &self,
        pool: &ThreadPool,
        ctx: &StepContext,
        population: &Population,
        seeds: &[u64],
    ) -> Result<StepOutcome> {
        let steps = pool.install(|| {
            population
                .walkers
                .par_iter()
                .zip(population.weights.par_iter())
                .zip(seeds.par_iter())
                .map(|((walker, &weight), &seed)| {
                    let mut rng = StdRng::seed_from_u64(seed);
                    imag_time_propagator_qaee(ctx, walker, weight, &mut rng)
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let energies: Vec<Complex64> = steps.iter().map(|s| s.energy).collect();
        let numerators: Vec<Complex64> = steps.iter().map(|s| s.quantum_energy).collect();
        let ratios: Vec<Complex64> = steps.iter().map(|s| s.overlap_ratio).collect();
        let energy = weighted_energy(&population.weights, &energies, ctx.step)?;
        let quantum_energy = ratio_energy(
            &population.weights,
            &numerators,
            &ratios,
            self.params.overlap_tolerance,
            ctx.step,
        )?;
        debug!("checkpoint step {}: classical {:.8}, quantum {:.8}", ctx.step, energy, quantum_energy);

        let next = prune(
            steps.into_iter().map(|s| (s.walker, s.weight, None)),
            self.params.weight_threshold,
        );
        Ok(StepOutcome {
            energy,
            quantum_energy: Some(quantum_energy),
            next,
        })
    }

    fn quantum_step(
        &self,
        pool: &ThreadPool,
        ctx: &StepContext,
        population: &Population,
        seeds: &[u64],
    ) -> Result<StepOutcome> {
        let steps = pool.install(|| {
            population
                .walkers
                .par_iter()
                .zip(population.weights.par_iter())
                .zip(population.overlaps.par_iter())
                .zip(seeds.par_iter())
                .map(|(((walker, &weight), &ovlp), &seed)| {
                    let mut rng = StdRng::seed_from_u64(seed);
                    q_imag_time_propagator(ctx, walker, weight, ovlp, &mut rng)
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let energies: Vec<Complex64> = steps.iter().map(|s| s.energy).collect();
        let energy = weighted_energy(&population.weights, &energies, ctx.step)?;
        let next = prune(
            steps.into_iter().map(|s| (s.walker, s.weight, Some(s.overlap))),
            self.params.weight_threshold,
        );
        Ok(StepOutcome {
            energy,
            quantum_energy: Some(energy),
            next,
        })
    }
}
