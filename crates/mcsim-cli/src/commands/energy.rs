use crate::cli::{EnergyArgs, RunOverrides};
use crate::config;
use crate::error::{CliError, Result};
use mcsim::core::forcefield::pair::PairLjCoulEwald;
use mcsim::core::forcefield::term::EnergyTerm;
use mcsim::core::io::xyz;
use mcsim::engine::config::{InitialPlacement, NvtConfig, Seed};
use mcsim::engine::error::EngineError;
use mcsim::workflows::nvt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Lattice orientation seed used when the configuration leaves the seed to the clock.
const DEFAULT_LATTICE_SEED: u64 = 0;

pub fn run(args: EnergyArgs) -> Result<()> {
    let mut app_config =
        config::build_config(&args.config, &RunOverrides::default(), &args.set_values)?;
    let core_config = &mut app_config.core_config;
    core_config.placement = match args.xyz {
        Some(_) => InitialPlacement::Seek,
        None => InitialPlacement::Lattice,
    };

    let (pair, molecules) = evaluate(core_config, args.xyz.as_deref())?;
    print_energy(pair.energy(), molecules, pair.ewald().num_wave_vectors());
    Ok(())
}

fn lattice_seed(seed: Seed) -> u64 {
    match seed {
        Seed::Fixed(seed) => seed,
        Seed::FromTime => DEFAULT_LATTICE_SEED,
    }
}

/// Builds the configuration described by `core_config`, or read from `xyz`, and
/// evaluates its energy. Returns the potential and the molecule count.
fn evaluate(core_config: &NvtConfig, xyz: Option<&Path>) -> Result<(PairLjCoulEwald, usize)> {
    let mut space = nvt::build_space(core_config, lattice_seed(core_config.seed))?;
    if let Some(path) = xyz {
        let frame = read_first_frame(path)?;
        xyz::populate_space(&frame, &mut space, 0).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
    }
    info!(molecules = space.num_molecules(), "Configuration ready.");

    let pair = PairLjCoulEwald::new(nvt::pair_config(core_config, space.simulation_box()), &space)
        .map_err(EngineError::from)?;
    Ok((pair, space.num_molecules()))
}

fn read_first_frame(path: &Path) -> Result<xyz::XyzFrame> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut line_no = 0;
    xyz::read_frame(&mut reader, &mut line_no)
        .map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?
        .ok_or_else(|| CliError::Config(format!("No frame found in '{}'", path.display())))
}

fn print_energy(energy: &EnergyTerm, molecules: usize, wave_vectors: usize) {
    println!("Energy of {} molecules ({} wave vectors), kJ/mol:", molecules, wave_vectors);
    println!("  Lennard-Jones        {:>16.6}", energy.lj);
    println!("  Long-range tail      {:>16.6}", energy.lrc);
    println!("  Real-space Coulomb   {:>16.6}", energy.real);
    println!("  Reciprocal Coulomb   {:>16.6}", energy.fourier);
    println!("  Self correction     -{:>16.6}", energy.self_energy);
    println!("  Total                {:>16.6}", energy.total());
    if molecules > 0 {
        println!("  Per molecule         {:>16.6}", energy.total() / molecules as f64);
    }
}
