use crate::cli::RunArgs;
use crate::config::{self, ReferenceConfig};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use mcsim::engine::progress::ProgressReporter;
use mcsim::workflows::nvt::{self, NvtResult};
use tracing::info;

pub fn run(args: RunArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app_config = config::build_config(&args.config, &args.overrides, &args.set_values)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Starting NVT simulation of {} molecules at {} K...",
        app_config.core_config.molecules, app_config.core_config.temperature
    );
    let result = nvt::run(&app_config.core_config, &reporter)?;
    print_summary(&result);

    match app_config.reference {
        Some(reference) if !args.no_reference => check_reference(&result, &reference),
        _ => Ok(()),
    }
}

fn check_reference(result: &NvtResult, reference: &ReferenceConfig) -> Result<()> {
    nvt::compare_with_reference(result, reference.pe_per_molecule, reference.stdev, reference.z)?;
    println!(
        "✓ Consistent with the reference {:.4} kJ/mol (z = {}).",
        reference.pe_per_molecule, reference.z
    );
    Ok(())
}

fn print_summary(result: &NvtResult) {
    match result.pe_per_molecule_block_stdev {
        Some(stdev) => println!(
            "Potential energy per molecule: {:.4} ± {:.4} kJ/mol ({} molecules, {} trials)",
            result.pe_per_molecule_mean, stdev, result.n_mol, result.production_trials
        ),
        None => println!(
            "Potential energy per molecule: {:.4} kJ/mol ({} molecules, {} trials, no block error)",
            result.pe_per_molecule_mean, result.n_mol, result.production_trials
        ),
    }
    for trial in &result.trials {
        println!(
            "  {:<10} acceptance {:.3}  max move {:.4}",
            trial.kind.as_str(),
            trial.acceptance,
            trial.max_move
        );
    }
}
