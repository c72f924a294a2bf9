use mcsim::core::forcefield::params::TemplateSource;
use mcsim::engine::config::{InitialPlacement, NvtConfig, NvtConfigBuilder, OutputConfig, Seed};
use mcsim::engine::mc::MonteCarlo;
use mcsim::engine::progress::ProgressReporter;
use mcsim::engine::trial::TrialKind;
use mcsim::workflows::nvt::{self, Z_99};
use std::path::Path;
use tempfile::tempdir;

const REFERENCE_PE_PER_MOLECULE: f64 = -46.82; // kJ/mol
const REFERENCE_STDEV: f64 = 0.02;
const BOX_LENGTH_512: f64 = 24.8586887;

fn shipped_template() -> TemplateSource {
    TemplateSource::File(Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/forcefield/spce.toml"))
}

fn small_water_builder() -> NvtConfigBuilder {
    NvtConfigBuilder::new()
        .box_length(12.4293444)
        .template(shipped_template())
        .alpha_l(5.6)
        .k2max(38)
        .temperature(298.0)
        .molecules(64)
        .placement(InitialPlacement::Lattice)
        .trial(TrialKind::Translate, 0.1, 1.0)
        .trial(TrialKind::Rotate, 0.1, 1.0)
        .tune_frequency(500)
        .check_energy(500, 1e-6)
        .equilibration_trials(3_000)
        .production_trials(2_000)
        .block_size(500)
        .seed(Seed::Fixed(2024))
}

#[test]
fn short_liquid_run_keeps_energy_consistent() {
    let config = small_water_builder().build().unwrap();
    let result = nvt::run(&config, &ProgressReporter::new()).unwrap();

    assert_eq!(result.n_mol, 64);
    assert_eq!(result.production_trials, 2_000);
    assert!(result.pe_per_molecule_mean.is_finite());
    assert!(result.pe_per_molecule_mean < 0.0);
    assert!(result.pe_per_molecule_block_stdev.is_some());
    for trial in &result.trials {
        assert!(trial.acceptance > 0.0 && trial.acceptance < 1.0);
    }
}

#[test]
fn run_writes_production_files_and_resumable_restart() {
    let dir = tempdir().unwrap();
    let restart = dir.path().join("restart.json");
    let output = OutputConfig {
        log: Some(dir.path().join("log.csv")),
        log_frequency: 250,
        movie: Some(dir.path().join("movie.xyz")),
        movie_frequency: 1_000,
        restart: Some(restart.clone()),
        restart_frequency: 500,
        production_suffix: "_prod".to_string(),
    };
    let config = small_water_builder()
        .molecules(27)
        .equilibration_trials(1_000)
        .production_trials(1_000)
        .output(output)
        .build()
        .unwrap();
    nvt::run(&config, &ProgressReporter::new()).unwrap();

    for name in ["log.csv", "log_prod.csv", "movie.xyz", "movie_prod.xyz"] {
        assert!(dir.path().join(name).exists(), "missing {name}");
    }
    let log = std::fs::read_to_string(dir.path().join("log_prod.csv")).unwrap();
    assert_eq!(log.lines().count(), 1 + 4);

    let mut resumed = MonteCarlo::from_restart(&restart).unwrap();
    assert!(resumed.is_production());
    assert_eq!(resumed.space().num_molecules(), 27);
    resumed.run_num_trials(200).unwrap();
    assert_eq!(resumed.attempts(), 1_200);
}

fn reference_builder(placement: InitialPlacement) -> NvtConfigBuilder {
    NvtConfigBuilder::new()
        .box_length(BOX_LENGTH_512)
        .template(shipped_template())
        .alpha_l(5.6)
        .k2max(38)
        .temperature(298.0)
        .activity(1.0)
        .molecules(512)
        .placement(placement)
        .trial(TrialKind::Translate, 0.1, 1.0)
        .trial(TrialKind::Rotate, 0.1, 1.0)
        .tune_frequency(10_000)
        .check_energy(10_000, 1e-6)
        .equilibration_trials(1_000_000)
        .production_trials(1_000_000)
}

fn assert_matches_reference(config: &NvtConfig) {
    let result = nvt::run(config, &ProgressReporter::new()).unwrap();
    assert_eq!(result.n_mol, 512);
    nvt::compare_with_reference(&result, REFERENCE_PE_PER_MOLECULE, REFERENCE_STDEV, Z_99)
        .unwrap();
}

/// 512 SPC/E molecules at 298 K: 1e6 equilibration and 1e6 production trials.
#[test]
#[ignore = "long-running reference simulation"]
fn spce_512_matches_reference_energy() {
    let config = reference_builder(InitialPlacement::Lattice).build().unwrap();
    assert_matches_reference(&config);
}

/// Same state point, with the liquid built by inserting all 512 molecules into
/// an empty cell.
#[test]
#[ignore = "long-running reference simulation"]
fn spce_512_from_empty_cell_matches_reference_energy() {
    let config = reference_builder(InitialPlacement::Seek).build().unwrap();
    assert_matches_reference(&config);
}

#[test]
fn seek_builds_liquid_before_sampling() {
    let config = small_water_builder()
        .box_length(9.3220083)
        .molecules(27)
        .placement(InitialPlacement::Seek)
        .equilibration_trials(500)
        .production_trials(500)
        .build()
        .unwrap();
    let result = nvt::run(&config, &ProgressReporter::new()).unwrap();

    assert_eq!(result.n_mol, 27);
    assert_eq!(result.production_trials, 500);
    assert!(result.pe_per_molecule_mean.is_finite());
}
