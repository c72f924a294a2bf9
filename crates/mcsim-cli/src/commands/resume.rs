use crate::cli::ResumeArgs;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use mcsim::engine::config::DEFAULT_SEEK_MAX_ATTEMPTS;
use mcsim::engine::mc::MonteCarlo;
use mcsim::engine::progress::{Progress, ProgressReporter};
use mcsim::workflows::nvt;
use tracing::info;

pub fn run(args: ResumeArgs) -> Result<()> {
    let mut mc = MonteCarlo::from_restart(&args.restart)?;
    let phase = if mc.is_production() {
        "Production"
    } else {
        "Equilibration"
    };
    info!(
        attempts = mc.attempts(),
        molecules = mc.space().num_molecules(),
        phase,
        "Loaded restart file."
    );

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    if mc.is_seeking() {
        reporter.report(Progress::PhaseStart {
            name: "Preparation",
        });
        mc.continue_seek(DEFAULT_SEEK_MAX_ATTEMPTS)?;
        reporter.report(Progress::PhaseFinish);
    }
    reporter.report(Progress::PhaseStart { name: phase });
    mc.run_num_trials_with_progress(args.trials, &reporter)?;
    reporter.report(Progress::PhaseFinish);

    let result = nvt::summarize(&mc);
    println!(
        "Resumed {} trials; {} attempts since the last statistics reset.",
        args.trials,
        mc.attempts()
    );
    println!(
        "Potential energy per molecule: {:.4} kJ/mol (current {:.4}, {} molecules)",
        result.pe_per_molecule_mean,
        mc.pe_per_molecule(),
        result.n_mol
    );
    if let Some(restart) = &mc.output().restart {
        mc.write_restart(&restart.path)?;
        println!("Restart written to: {}", restart.path.display());
    }
    Ok(())
}
