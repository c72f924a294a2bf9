use super::accumulator::Accumulator;
use super::checkpoint::{CHECKPOINT_VERSION, Checkpoint};
use super::config::EnergyCheck;
use super::criteria::AcceptanceCriteria;
use super::error::EngineError;
use super::output::{
    self, DEFAULT_PRODUCTION_SUFFIX, OutputSettings, PeriodicFile, with_suffix,
};
use super::progress::{Progress, ProgressReporter};
use super::seek::SeekState;
use super::trial::{Trial, TrialKind, TrialOutcome};
use crate::core::forcefield::pair::{PairConfig, PairLjCoulEwald};
use crate::core::models::space::Space;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

const PROGRESS_STRIDE: u64 = 1_000;

/// Metropolis Monte Carlo driver: owns the configuration, its potential, the
/// acceptance criteria, the registered trials and everything written to disk.
#[derive(Debug, Clone)]
pub struct MonteCarlo {
    pub(crate) space: Space,
    pub(crate) pair: PairLjCoulEwald,
    pub(crate) criteria: AcceptanceCriteria,
    pub(crate) trials: Vec<Trial>,
    cumulative: Vec<f64>,
    rng: ChaCha20Rng,
    attempts: u64,
    pe: Accumulator,
    n_mol: Accumulator,
    output: OutputSettings,
    tune_frequency: u64,
    check_energy: Option<EnergyCheck>,
    production: bool,
    production_suffix: String,
    pub(crate) seek: Option<SeekState>,
}

impl MonteCarlo {
    /// Binds a configuration, a pair potential built for it and the acceptance criteria.
    pub fn new(
        space: Space,
        pair_config: PairConfig,
        criteria: impl Into<AcceptanceCriteria>,
        seed: u64,
    ) -> Result<Self, EngineError> {
        let pair = PairLjCoulEwald::new(pair_config, &space)?;
        info!(
            seed,
            molecules = space.num_molecules(),
            wave_vectors = pair.ewald().num_wave_vectors(),
            "Initialized Monte Carlo simulation."
        );
        Ok(Self {
            space,
            pair,
            criteria: criteria.into(),
            trials: Vec::new(),
            cumulative: Vec::new(),
            rng: ChaCha20Rng::seed_from_u64(seed),
            attempts: 0,
            pe: Accumulator::default(),
            n_mol: Accumulator::default(),
            output: OutputSettings::default(),
            tune_frequency: 0,
            check_energy: None,
            production: false,
            production_suffix: DEFAULT_PRODUCTION_SUFFIX.to_string(),
            seek: None,
        })
    }

    pub fn add_trial(&mut self, kind: TrialKind, max_move: f64, weight: f64) -> Result<(), EngineError> {
        self.push_trial(Trial::new(kind, max_move, weight)?);
        Ok(())
    }

    pub fn push_trial(&mut self, trial: Trial) {
        self.trials.push(trial);
        self.rebuild_selection();
    }

    pub(crate) fn pop_trial(&mut self) -> Option<Trial> {
        let trial = self.trials.pop();
        self.rebuild_selection();
        trial
    }

    /// Adds a rigid-body move by name (`"translate"` or `"rotate"`) with unit weight.
    pub fn transform_trial(&mut self, name: &str, max_move: f64) -> Result<(), EngineError> {
        let kind: TrialKind = name.parse()?;
        if !kind.is_tunable() {
            return Err(EngineError::InvalidTrial {
                trial: name.to_string(),
                reason: "not a rigid-body transformation".to_string(),
            });
        }
        self.add_trial(kind, max_move, 1.0)
    }

    fn rebuild_selection(&mut self) {
        let total: f64 = self.trials.iter().map(|t| t.weight()).sum();
        let mut running = 0.0;
        self.cumulative = self
            .trials
            .iter()
            .map(|t| {
                running += t.weight();
                running / total
            })
            .collect();
    }

    fn select_trial(&mut self) -> usize {
        let u: f64 = self.rng.r#gen();
        self.cumulative
            .iter()
            .position(|&c| u < c)
            .unwrap_or(self.trials.len() - 1)
    }

    pub fn init_log(&mut self, path: impl Into<PathBuf>, frequency: u64) {
        self.output.log = Some(PeriodicFile::new(path, frequency));
    }

    pub fn init_movie(&mut self, path: impl Into<PathBuf>, frequency: u64) {
        self.output.movie = Some(PeriodicFile::new(path, frequency));
    }

    pub fn init_restart(&mut self, path: impl Into<PathBuf>, frequency: u64) {
        self.output.restart = Some(PeriodicFile::new(path, frequency));
    }

    pub fn set_tune_frequency(&mut self, frequency: u64) {
        self.tune_frequency = frequency;
    }

    pub fn set_check_energy(&mut self, frequency: u64, tolerance: f64) {
        self.check_energy = (frequency > 0).then_some(EnergyCheck {
            frequency,
            tolerance,
        });
    }

    pub fn set_production_suffix(&mut self, suffix: &str) {
        self.production_suffix = suffix.to_string();
    }

    /// Sets the block size of both accumulators, discarding their values.
    pub fn set_block_size(&mut self, block_size: u64) {
        self.pe.set_block_size(block_size);
        self.n_mol.set_block_size(block_size);
    }

    /// Attempts one randomly selected trial and runs the periodic output, energy
    /// check and tuning hooks.
    ///
    /// The first attempt (and the first after [`MonteCarlo::zero_stat`]) recomputes
    /// the energy from scratch.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoTrials`] if no trial was added, or any error raised
    /// by the trial, the energy check or the output files.
    pub fn attempt_trial(&mut self) -> Result<TrialOutcome, EngineError> {
        let outcome = self.step()?;
        if outcome != TrialOutcome::Skipped {
            self.after_attempt()?;
        }
        Ok(outcome)
    }

    fn step(&mut self) -> Result<TrialOutcome, EngineError> {
        if self.trials.is_empty() {
            return Err(EngineError::NoTrials);
        }
        if self.attempts == 0 {
            self.pair.init_energy(&self.space)?;
        }
        let index = self.select_trial();
        let outcome = self.trials[index].attempt(
            &mut self.space,
            &mut self.pair,
            &self.criteria,
            &mut self.rng,
        )?;
        if outcome == TrialOutcome::Skipped {
            return Ok(outcome);
        }
        self.pe.accumulate(self.pair.total());
        self.n_mol.accumulate(self.space.num_molecules() as f64);
        self.attempts += 1;
        Ok(outcome)
    }

    fn after_attempt(&mut self) -> Result<(), EngineError> {
        let attempts = self.attempts;

        if let Some(check) = self.check_energy {
            if attempts % check.frequency == 0 {
                let recomputed = self.pair.check_energy(&self.space, check.tolerance)?;
                debug!(attempts, total = recomputed.total(), "Energy check passed.");
            }
        }

        // The log and movie record sampling only; a seek adds a temporary trial column.
        let sampling = self.seek.is_none();
        if let Some(path) = self.due_path(&self.output.log).filter(|_| sampling) {
            let header = output::log_header(&self.trials);
            let record =
                output::log_record(attempts, self.pe_per_molecule(), &self.space, &self.trials);
            output::append_log(&path, &header, &record)?;
        }

        if let Some(path) = self.due_path(&self.output.movie).filter(|_| sampling) {
            output::append_movie(&path, &self.space, attempts)?;
        }

        if self.tune_frequency > 0 && attempts % self.tune_frequency == 0 {
            let max_translate = self.space.simulation_box().min_length() / 2.0;
            for trial in &mut self.trials {
                trial.tune(max_translate);
            }
        }

        // Last, so the file holds the state after every hook of this attempt.
        if let Some(path) = self.due_path(&self.output.restart) {
            self.write_restart(&path)?;
        }
        Ok(())
    }

    fn due_path(&self, file: &Option<PeriodicFile>) -> Option<PathBuf> {
        file.as_ref()
            .filter(|f| f.is_due(self.attempts))
            .map(|f| f.path.clone())
    }

    pub fn run_num_trials(&mut self, n: u64) -> Result<(), EngineError> {
        self.run_num_trials_with_progress(n, &ProgressReporter::new())
    }

    #[instrument(skip_all, fields(trials = n))]
    pub fn run_num_trials_with_progress(
        &mut self,
        n: u64,
        reporter: &ProgressReporter,
    ) -> Result<(), EngineError> {
        reporter.report(Progress::TaskStart { total_steps: n });
        for i in 1..=n {
            self.attempt_trial()?;
            if i % PROGRESS_STRIDE == 0 {
                reporter.report(Progress::TaskIncrement {
                    steps: PROGRESS_STRIDE,
                });
            }
        }
        let remainder = n % PROGRESS_STRIDE;
        if remainder > 0 {
            reporter.report(Progress::TaskIncrement { steps: remainder });
        }
        reporter.report(Progress::TaskFinish);
        Ok(())
    }

    /// Switches to production: log and movie file names get the production suffix.
    pub fn init_production(&mut self) {
        if self.production {
            return;
        }
        self.production = true;
        let suffix = self.production_suffix.clone();
        for file in [&mut self.output.log, &mut self.output.movie]
            .into_iter()
            .flatten()
        {
            file.path = with_suffix(&file.path, &suffix);
        }
        info!("Production phase started.");
    }

    /// Clears trial statistics, accumulators and the attempt counter.
    pub fn zero_stat(&mut self) {
        for trial in &mut self.trials {
            trial.reset_stats();
        }
        self.pe.reset();
        self.n_mol.reset();
        self.attempts = 0;
    }

    #[inline]
    pub fn space(&self) -> &Space {
        &self.space
    }

    #[inline]
    pub fn pair(&self) -> &PairLjCoulEwald {
        &self.pair
    }

    #[inline]
    pub fn criteria(&self) -> &AcceptanceCriteria {
        &self.criteria
    }

    #[inline]
    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    #[inline]
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    #[inline]
    pub fn is_production(&self) -> bool {
        self.production
    }

    #[inline]
    pub fn output(&self) -> &OutputSettings {
        &self.output
    }

    /// Accumulated total potential energy, one value per attempt.
    #[inline]
    pub fn pe_accumulator(&self) -> &Accumulator {
        &self.pe
    }

    #[inline]
    pub fn molecule_count_accumulator(&self) -> &Accumulator {
        &self.n_mol
    }

    /// Current potential energy per molecule, zero for an empty system.
    pub fn pe_per_molecule(&self) -> f64 {
        match self.space.num_molecules() {
            0 => 0.0,
            n => self.pair.total() / n as f64,
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            version: CHECKPOINT_VERSION,
            space: self.space.clone(),
            pair: *self.pair.config(),
            criteria: self.criteria,
            trials: self.trials.clone(),
            attempts: self.attempts,
            rng: self.rng.clone(),
            pe: self.pe.clone(),
            n_mol: self.n_mol.clone(),
            output: self.output.clone(),
            tune_frequency: self.tune_frequency,
            check_energy: self.check_energy,
            production: self.production,
            production_suffix: self.production_suffix.clone(),
            seek: self.seek,
        }
    }

    pub fn write_restart(&self, path: &Path) -> Result<(), EngineError> {
        self.checkpoint().store(path)
    }

    /// Rebuilds a simulation from a checkpoint, recomputing its energy.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn from_restart(path: &Path) -> Result<Self, EngineError> {
        let checkpoint = Checkpoint::load(path)?;
        let mc = Self::from_checkpoint(checkpoint)?;
        info!(
            attempts = mc.attempts,
            molecules = mc.space.num_molecules(),
            "Resumed from checkpoint."
        );
        Ok(mc)
    }

    pub fn from_checkpoint(checkpoint: Checkpoint) -> Result<Self, EngineError> {
        let pair = PairLjCoulEwald::new(checkpoint.pair, &checkpoint.space)?;
        let mut mc = Self {
            space: checkpoint.space,
            pair,
            criteria: checkpoint.criteria,
            trials: checkpoint.trials,
            cumulative: Vec::new(),
            rng: checkpoint.rng,
            attempts: checkpoint.attempts,
            pe: checkpoint.pe,
            n_mol: checkpoint.n_mol,
            output: checkpoint.output,
            tune_frequency: checkpoint.tune_frequency,
            check_energy: checkpoint.check_energy,
            production: checkpoint.production,
            production_suffix: checkpoint.production_suffix,
            seek: checkpoint.seek,
        };
        mc.rebuild_selection();
        Ok(mc)
    }

    pub(crate) fn set_criteria(&mut self, criteria: AcceptanceCriteria) {
        self.criteria = criteria;
    }

    pub(crate) fn total_trial_weight(&self) -> f64 {
        self.trials.iter().map(|t| t.weight()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::ewald::EwaldConfig;
    use crate::core::models::molecule::MoleculeTemplate;
    use crate::core::models::simulation_box::SimulationBox;
    use crate::engine::criteria::Metropolis;
    use std::fs;
    use tempfile::tempdir;

    fn small_water(seed: u64) -> MonteCarlo {
        let mut space = Space::new(SimulationBox::cubic(12.0).unwrap());
        let water = space.add_template(MoleculeTemplate::spce());
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        space.fill_cubic_lattice(water, 27, &mut rng).unwrap();
        let config = PairConfig {
            r_cut: 6.0,
            ewald: EwaldConfig {
                alpha_l: 5.6,
                k2max: 38,
            },
            long_range_correction: true,
            linear_shift: false,
        };
        let criteria = Metropolis::from_temperature(298.0, 1.0).unwrap();
        let mut mc = MonteCarlo::new(space, config, criteria, seed).unwrap();
        mc.add_trial(TrialKind::Translate, 0.3, 1.0).unwrap();
        mc.transform_trial("rotate", 0.3).unwrap();
        mc
    }

    #[test]
    fn attempt_trial_without_trials_fails() {
        let mut mc = small_water(1);
        mc.trials.clear();
        mc.rebuild_selection();
        assert!(matches!(mc.attempt_trial(), Err(EngineError::NoTrials)));
    }

    #[test]
    fn transform_trial_rejects_non_rigid_moves() {
        let mut mc = small_water(1);
        assert!(matches!(
            mc.transform_trial("add", 0.1),
            Err(EngineError::InvalidTrial { .. })
        ));
        assert!(matches!(
            mc.transform_trial("spin", 0.1),
            Err(EngineError::UnknownTrial(_))
        ));
    }

    #[test]
    fn incremental_energy_survives_frequent_checks() {
        let mut mc = small_water(2);
        mc.set_check_energy(50, 1e-6);
        mc.set_tune_frequency(100);
        mc.run_num_trials(2_000).unwrap();
        assert_eq!(mc.attempts(), 2_000);
        assert_eq!(mc.pe_accumulator().count(), 2_000);
        assert_eq!(mc.molecule_count_accumulator().average(), 27.0);
        let (recomputed, _) = mc.pair().compute(mc.space()).unwrap();
        assert!((mc.pair().total() - recomputed.total()).abs() < 1e-6 * recomputed.total().abs());
    }

    #[test]
    fn equilibration_lowers_lattice_energy() {
        let mut mc = small_water(3);
        let start = mc.pe_per_molecule();
        mc.set_tune_frequency(100);
        mc.run_num_trials(3_000).unwrap();
        assert!(mc.pe_per_molecule() < start);
    }

    #[test]
    fn same_seed_gives_identical_trajectories() {
        let mut a = small_water(4);
        let mut b = small_water(4);
        a.run_num_trials(500).unwrap();
        b.run_num_trials(500).unwrap();
        assert_eq!(a.space(), b.space());
        assert_eq!(a.pair().total(), b.pair().total());
    }

    #[test]
    fn tuning_changes_step_sizes() {
        let mut mc = small_water(5);
        mc.set_tune_frequency(10);
        mc.run_num_trials(200).unwrap();
        assert!(mc.trials().iter().all(|t| t.max_move() != 0.3));
    }

    #[test]
    fn zero_stat_resets_counters_and_statistics() {
        let mut mc = small_water(6);
        mc.run_num_trials(100).unwrap();
        mc.zero_stat();
        assert_eq!(mc.attempts(), 0);
        assert_eq!(mc.pe_accumulator().count(), 0);
        assert!(mc.trials().iter().all(|t| t.stats().attempted == 0));
    }

    #[test]
    fn log_and_movie_are_written_periodically_with_production_suffix() {
        let dir = tempdir().unwrap();
        let mut mc = small_water(7);
        mc.init_log(dir.path().join("log.csv"), 50);
        mc.init_movie(dir.path().join("movie.xyz"), 100);
        mc.run_num_trials(200).unwrap();

        let log = fs::read_to_string(dir.path().join("log.csv")).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(
            lines[0],
            "attempts,pe_per_mol,n_mol,translate_acceptance,translate_max_move,rotate_acceptance,rotate_max_move,config_id"
        );
        let movie = fs::read_to_string(dir.path().join("movie.xyz")).unwrap();
        assert_eq!(movie.lines().count(), 2 * (2 + 81));

        mc.init_production();
        mc.init_production();
        mc.zero_stat();
        mc.run_num_trials(50).unwrap();
        assert!(dir.path().join("log_prod.csv").exists());
        assert!(!dir.path().join("log_prod_prod.csv").exists());
        assert!(mc.is_production());
    }

    #[test]
    fn restart_round_trip_continues_identically() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("restart.json");
        let mut mc = small_water(8);
        mc.init_restart(&path, 100);
        mc.run_num_trials(200).unwrap();
        assert!(path.exists());
        assert!(dir.path().join("restart.json.bak").exists());

        let mut resumed = MonteCarlo::from_restart(&path).unwrap();
        assert_eq!(resumed.attempts(), 200);
        assert_eq!(resumed.space(), mc.space());
        assert!((resumed.pair().total() - mc.pair().total()).abs() < 1e-8 * mc.pair().total().abs());

        mc.run_num_trials(100).unwrap();
        resumed.run_num_trials(100).unwrap();
        assert_eq!(resumed.space(), mc.space());
        assert_eq!(resumed.trials(), mc.trials());
    }

    #[test]
    fn restart_from_other_format_version_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("restart.json");
        let mc = small_water(3);
        mc.write_restart(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let current = format!("\"version\":{}", CHECKPOINT_VERSION);
        assert!(content.contains(&current));
        let bumped = format!("\"version\":{}", CHECKPOINT_VERSION + 1);
        std::fs::write(&path, content.replacen(&current, &bumped, 1)).unwrap();
        assert!(matches!(
            MonteCarlo::from_restart(&path),
            Err(EngineError::UnsupportedCheckpointVersion { .. })
        ));
    }

    #[test]
    fn restart_with_tuning_resumes_with_tuned_moves() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("restart.json");
        let mut mc = small_water(8);
        mc.set_tune_frequency(100);
        mc.init_restart(&path, 100);
        mc.run_num_trials(200).unwrap();

        let mut resumed = MonteCarlo::from_restart(&path).unwrap();
        let max_moves = |m: &MonteCarlo| m.trials().iter().map(|t| t.max_move()).collect::<Vec<_>>();
        assert_eq!(max_moves(&resumed), max_moves(&mc));
        assert_ne!(max_moves(&mc), vec![0.3, 0.3]);

        mc.run_num_trials(300).unwrap();
        resumed.run_num_trials(300).unwrap();
        assert_eq!(resumed.space(), mc.space());
        assert_eq!(resumed.trials(), mc.trials());
    }
}
