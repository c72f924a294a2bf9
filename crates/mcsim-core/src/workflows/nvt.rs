use crate::core::forcefield::pair::PairConfig;
use crate::core::models::simulation_box::SimulationBox;
use crate::core::models::space::Space;
use crate::engine::config::{InitialPlacement, NvtConfig};
use crate::engine::criteria::Metropolis;
use crate::engine::error::EngineError;
use crate::engine::mc::MonteCarlo;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::trial::TrialKind;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Two-sided 99 % quantile of the standard normal distribution.
pub const Z_99: f64 = 2.576;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(
        "Mean potential energy per molecule {mean:.4} deviates from the reference {reference:.4} by {deviation:.4} (allowed {allowed:.4})"
    )]
    ReferenceMismatch {
        mean: f64,
        reference: f64,
        allowed: f64,
        deviation: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialAcceptance {
    pub kind: TrialKind,
    pub acceptance: f64,
    pub max_move: f64,
}

/// Production statistics of an NVT run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NvtResult {
    pub pe_per_molecule_mean: f64,
    /// Block standard deviation of the total potential energy divided by the
    /// molecule count; `None` if production held fewer than two blocks.
    pub pe_per_molecule_block_stdev: Option<f64>,
    pub n_mol: usize,
    pub production_trials: u64,
    pub trials: Vec<TrialAcceptance>,
}

/// Cell with the configured template registered as template 0 and, for lattice
/// placement, filled with the requested molecules.
pub fn build_space(config: &NvtConfig, seed: u64) -> Result<Space, EngineError> {
    let mut space = Space::new(SimulationBox::new(&config.box_lengths)?);
    let template = space.add_template(config.template.load()?);
    if config.placement == InitialPlacement::Lattice {
        let mut rng = ChaCha20Rng::seed_from_u64(seed.wrapping_add(1));
        space.fill_cubic_lattice(template, config.molecules, &mut rng)?;
    }
    Ok(space)
}

/// Pair parameters of `config`; the cutoff defaults to half the shortest cell edge.
pub fn pair_config(config: &NvtConfig, simulation_box: &SimulationBox) -> PairConfig {
    PairConfig {
        r_cut: config
            .r_cut
            .unwrap_or_else(|| simulation_box.min_length() / 2.0),
        ewald: config.ewald,
        long_range_correction: config.long_range_correction,
        linear_shift: config.linear_shift,
    }
}

/// Builds the configuration, potential, criteria and trials described by `config`
/// without running any trial.
pub fn prepare(config: &NvtConfig) -> Result<MonteCarlo, EngineError> {
    let seed = config.seed.resolve();
    let space = build_space(config, seed)?;
    let pair = pair_config(config, space.simulation_box());
    let criteria = Metropolis::from_temperature(config.temperature, config.activity)?;
    let mut mc = MonteCarlo::new(space, pair, criteria, seed)?;

    for trial in &config.trials {
        mc.add_trial(trial.kind, trial.max_move, trial.weight)?;
    }

    let output = &config.output;
    if let Some(path) = &output.log {
        mc.init_log(path, output.log_frequency);
    }
    if let Some(path) = &output.movie {
        mc.init_movie(path, output.movie_frequency);
    }
    if let Some(path) = &output.restart {
        mc.init_restart(path, output.restart_frequency);
    }
    mc.set_production_suffix(&output.production_suffix);
    mc.set_tune_frequency(config.tune_frequency);
    if let Some(check) = config.check_energy {
        mc.set_check_energy(check.frequency, check.tolerance);
    }
    mc.set_block_size(config.block_size);
    Ok(mc)
}

/// Runs seek, equilibration and production, returning production statistics.
#[instrument(skip_all, name = "nvt_workflow")]
pub fn run(config: &NvtConfig, reporter: &ProgressReporter) -> Result<NvtResult, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    let mut mc = prepare(config)?;
    mc.seek_molecule_count(config.molecules, config.seek_max_attempts)?;
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart {
        name: "Equilibration",
    });
    info!(
        trials = config.equilibration_trials,
        molecules = mc.space().num_molecules(),
        "Starting equilibration."
    );
    mc.run_num_trials_with_progress(config.equilibration_trials, reporter)?;
    reporter.report(Progress::PhaseFinish);

    finish(mc, config.production_trials, reporter)
}

/// Switches `mc` to production, samples `trials` attempts with tuning off and
/// summarizes them.
pub fn finish(
    mut mc: MonteCarlo,
    trials: u64,
    reporter: &ProgressReporter,
) -> Result<NvtResult, EngineError> {
    reporter.report(Progress::PhaseStart { name: "Production" });
    mc.init_production();
    mc.zero_stat();
    mc.set_tune_frequency(0);
    mc.run_num_trials_with_progress(trials, reporter)?;
    reporter.report(Progress::PhaseFinish);

    let result = summarize(&mc);
    info!(
        mean = result.pe_per_molecule_mean,
        block_stdev = ?result.pe_per_molecule_block_stdev,
        molecules = result.n_mol,
        "Production finished."
    );
    Ok(result)
}

/// Collects the statistics accumulated since the last [`MonteCarlo::zero_stat`].
pub fn summarize(mc: &MonteCarlo) -> NvtResult {
    let n_mol = mc.space().num_molecules();
    let pe = mc.pe_accumulator();
    let (mean, block_stdev) = match n_mol {
        0 => (0.0, None),
        n => (
            pe.average() / n as f64,
            pe.block_stdev().map(|s| s / n as f64),
        ),
    };
    if block_stdev.is_none() {
        warn!(
            samples = pe.count(),
            block_size = pe.block_size(),
            "Fewer than two blocks accumulated; no block error estimate."
        );
    }
    NvtResult {
        pe_per_molecule_mean: mean,
        pe_per_molecule_block_stdev: block_stdev,
        n_mol,
        production_trials: pe.count(),
        trials: mc
            .trials()
            .iter()
            .map(|t| TrialAcceptance {
                kind: t.kind(),
                acceptance: t.stats().acceptance(),
                max_move: t.max_move(),
            })
            .collect(),
    }
}

/// Accepts `result` when its mean lies within `z * (reference_stdev + block_stdev)`
/// of `reference`. A missing block error counts as zero.
pub fn compare_with_reference(
    result: &NvtResult,
    reference: f64,
    reference_stdev: f64,
    z: f64,
) -> Result<(), WorkflowError> {
    let allowed = z * (reference_stdev + result.pe_per_molecule_block_stdev.unwrap_or(0.0));
    let deviation = (result.pe_per_molecule_mean - reference).abs();
    if deviation <= allowed {
        Ok(())
    } else {
        Err(WorkflowError::ReferenceMismatch {
            mean: result.pe_per_molecule_mean,
            reference,
            allowed,
            deviation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{NvtConfigBuilder, OutputConfig, Seed};
    use std::sync::atomic::{AtomicU64, Ordering};
    use tempfile::tempdir;

    fn result_with(mean: f64, block_stdev: Option<f64>) -> NvtResult {
        NvtResult {
            pe_per_molecule_mean: mean,
            pe_per_molecule_block_stdev: block_stdev,
            n_mol: 512,
            production_trials: 1_000_000,
            trials: Vec::new(),
        }
    }

    fn small_builder() -> NvtConfigBuilder {
        NvtConfigBuilder::new()
            .box_length(12.0)
            .r_cut(5.5)
            .alpha_l(5.6)
            .k2max(27)
            .temperature(298.0)
            .molecules(8)
            .placement(InitialPlacement::Lattice)
            .trial(TrialKind::Translate, 0.2, 1.0)
            .trial(TrialKind::Rotate, 0.2, 1.0)
            .equilibration_trials(200)
            .production_trials(400)
            .block_size(100)
            .seed(Seed::Fixed(7))
            .check_energy(100, 1e-6)
    }

    #[test]
    fn compare_accepts_within_interval() {
        let result = result_with(-46.80, Some(0.01));
        assert!(compare_with_reference(&result, -46.82, 0.02, Z_99).is_ok());
    }

    #[test]
    fn compare_rejects_outside_interval() {
        let result = result_with(-45.0, Some(0.01));
        match compare_with_reference(&result, -46.82, 0.02, Z_99) {
            Err(WorkflowError::ReferenceMismatch {
                allowed, deviation, ..
            }) => {
                assert!((allowed - Z_99 * 0.03).abs() < 1e-12);
                assert!((deviation - 1.82).abs() < 1e-12);
            }
            other => panic!("unexpected comparison outcome: {other:?}"),
        }
    }

    #[test]
    fn compare_without_block_error_uses_reference_stdev_only() {
        let result = result_with(-46.82 + 0.9 * Z_99 * 0.02, None);
        assert!(compare_with_reference(&result, -46.82, 0.02, Z_99).is_ok());
        let result = result_with(-46.82 + 1.1 * Z_99 * 0.02, None);
        assert!(compare_with_reference(&result, -46.82, 0.02, Z_99).is_err());
    }

    #[test]
    fn prepare_defaults_cutoff_to_half_box() {
        let config = NvtConfigBuilder::new()
            .box_length(14.0)
            .alpha_l(5.6)
            .k2max(27)
            .temperature(298.0)
            .molecules(0)
            .trial(TrialKind::Translate, 0.1, 1.0)
            .equilibration_trials(0)
            .production_trials(0)
            .build()
            .unwrap();
        let mc = prepare(&config).unwrap();
        assert_eq!(mc.pair().config().r_cut, 7.0);
        assert_eq!(mc.trials().len(), 1);
    }

    #[test]
    fn lattice_placement_fills_requested_count() {
        let config = small_builder().build().unwrap();
        let mc = prepare(&config).unwrap();
        assert_eq!(mc.space().num_molecules(), 8);
    }

    #[test]
    fn run_produces_statistics_and_production_files() {
        let dir = tempdir().unwrap();
        let output = OutputConfig {
            log: Some(dir.path().join("nvt.csv")),
            log_frequency: 100,
            ..OutputConfig::default()
        };
        let config = small_builder().output(output).build().unwrap();

        let increments = AtomicU64::new(0);
        let reporter = ProgressReporter::with_callback(Box::new(|event: Progress| {
            if let Progress::TaskIncrement { steps } = event {
                increments.fetch_add(steps, Ordering::Relaxed);
            }
        }));
        let result = run(&config, &reporter).unwrap();

        assert_eq!(result.n_mol, 8);
        assert_eq!(result.production_trials, 400);
        assert!(result.pe_per_molecule_mean.is_finite());
        assert!(result.pe_per_molecule_block_stdev.is_some());
        assert_eq!(result.trials.len(), 2);
        assert_eq!(increments.load(Ordering::Relaxed), 600);
        assert!(dir.path().join("nvt.csv").exists());
        assert!(dir.path().join("nvt_prod.csv").exists());
    }

    #[test]
    fn fixed_seed_runs_are_reproducible() {
        let config = small_builder().build().unwrap();
        let first = run(&config, &ProgressReporter::new()).unwrap();
        let second = run(&config, &ProgressReporter::new()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn seek_placement_inserts_molecules() {
        let config = small_builder()
            .box_length(15.0)
            .r_cut(7.0)
            .placement(InitialPlacement::Seek)
            .molecules(4)
            .equilibration_trials(50)
            .production_trials(100)
            .build()
            .unwrap();
        let result = run(&config, &ProgressReporter::new()).unwrap();
        assert_eq!(result.n_mol, 4);
    }
}
