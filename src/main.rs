use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use quantum_afqmc::{
    read_run_config, AFQMCSimulation, QuantumDevice, ShotDevice, SlaterTrialCircuit, StatevectorDevice,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.yml")]
    config: String,

    /// Override the number of walkers
    #[arg(short, long)]
    walkers: Option<usize>,

    /// Override the number of time steps
    #[arg(short, long)]
    steps: Option<usize>,

    /// Seed for the run-level random generator
    #[arg(long)]
    seed: Option<u64>,

    /// Use a shot-based device with this many shots per circuit
    #[arg(long)]
    shots: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = read_run_config(&args.config).with_context(|| format!("reading {}", args.config))?;

    let mut params = config.params;
    if let Some(n) = args.walkers {
        params.n_walkers = n;
    }
    if let Some(n) = args.steps {
        params.n_steps = n;
    }
    if let Some(seed) = args.seed {
        params.seed = Some(seed);
    }

    let (hamiltonian, trial) = config.system.build(params.diagonal_decimals).context("building the Hamiltonian")?;
    info!(
        "{} spin-orbitals, {} electrons, {} Cholesky factors, E_HF = {:.8}",
        hamiltonian.num_spin_orbitals,
        hamiltonian.num_electrons,
        hamiltonian.num_fields(),
        hamiltonian.e_hf
    );

    let device: Box<dyn QuantumDevice> = match args.shots {
        Some(shots) => Box::new(ShotDevice::new(shots)),
        None => Box::new(StatevectorDevice::new()),
    };
    let trial_state = Box::new(SlaterTrialCircuit::new(&trial));

    let simulation = AFQMCSimulation::new(hamiltonian, trial, trial_state, device, params);
    let results = simulation.run().context("AFQMC run failed")?;

    println!("AFQMC Simulation Results");
    println!("------------------------");
    println!("{:>6} {:>10} {:>16} {:>8}", "step", "time", "energy (Ha)", "walkers");
    for (step, ((time, energy), walkers)) in results
        .times
        .iter()
        .zip(&results.energies)
        .zip(&results.populations)
        .enumerate()
    {
        println!("{:>6} {:>10.4} {:>16.8} {:>8}", step, time, energy, walkers);
    }

    if !results.quantum_energies.is_empty() {
        println!();
        println!("Quantum energy checkpoints");
        for q in &results.quantum_energies {
            println!("{:>6} {:>10.4} {:>16.8}", q.step, q.time, q.energy);
        }
    }

    Ok(())
}
