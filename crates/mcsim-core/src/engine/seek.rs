//! Driving the configuration to an exact molecule count before sampling.
//!
//! A temporary insertion (or deletion) trial is mixed with the registered moves
//! and run at a quarter of the inverse temperature, so that molecules can be
//! packed into a dense fluid. Detailed balance does not hold while seeking; the
//! statistics gathered meanwhile are discarded. Energy checks, tuning and
//! restart files keep running, and a restart written mid-seek carries the
//! [`SeekState`] needed to finish it with [`MonteCarlo::continue_seek`].

use super::criteria::{AcceptanceCriteria, Criteria};
use super::error::EngineError;
use super::mc::MonteCarlo;
use super::trial::{Trial, TrialKind};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

const SEEK_BETA_FACTOR: f64 = 0.25;

/// A seek in progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeekState {
    pub start: usize,
    pub target: usize,
    /// Criteria restored when the seek ends.
    pub criteria: AcceptanceCriteria,
    pub attempts: u64,
}

impl MonteCarlo {
    /// Inserts or deletes molecules of template 0 until the system holds `target` molecules.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SeekFailed`] if the target is not reached within
    /// `max_attempts` trial attempts. Trials, criteria and statistics are restored
    /// either way.
    #[instrument(skip_all, fields(target_molecules = target))]
    pub fn seek_molecule_count(&mut self, target: usize, max_attempts: u64) -> Result<(), EngineError> {
        let start = self.space.num_molecules();
        if start == target {
            return Ok(());
        }
        let kind = if start < target {
            TrialKind::Add
        } else {
            TrialKind::Delete
        };
        let weight = if self.trials.is_empty() {
            1.0
        } else {
            self.total_trial_weight() / 4.0
        };

        let saved_criteria = self.criteria;
        let seek_criteria = saved_criteria.with_scaled_beta(SEEK_BETA_FACTOR)?;
        info!(
            start,
            target,
            beta = seek_criteria.beta(),
            "Seeking molecule count with {} trials.",
            kind
        );
        self.push_trial(Trial::new(kind, 0.0, weight)?);
        self.set_criteria(seek_criteria);
        self.seek = Some(SeekState {
            start,
            target,
            criteria: saved_criteria,
            attempts: 0,
        });
        for trial in &mut self.trials {
            trial.initialize_seek(target);
        }
        self.continue_seek(max_attempts)
    }

    /// Finishes a seek that a restart file interrupted. Does nothing when no
    /// seek is in progress. `max_attempts` counts the attempts made before the
    /// restart too.
    pub fn continue_seek(&mut self, max_attempts: u64) -> Result<(), EngineError> {
        let Some(state) = self.seek else {
            return Ok(());
        };
        let result = self.run_seek(state, max_attempts);

        self.pop_trial();
        for trial in &mut self.trials {
            trial.clear_seek();
        }
        self.set_criteria(state.criteria);
        self.seek = None;
        self.zero_stat();
        result
    }

    #[inline]
    pub fn is_seeking(&self) -> bool {
        self.seek.is_some()
    }

    fn run_seek(&mut self, state: SeekState, max_attempts: u64) -> Result<(), EngineError> {
        let SeekState { start, target, .. } = state;
        let span = start.abs_diff(target);
        let mut next_quarter = self.space.num_molecules().abs_diff(start) * 4 / span + 1;
        let mut attempts = state.attempts;
        while self.space.num_molecules() != target {
            if attempts >= max_attempts {
                return Err(EngineError::SeekFailed {
                    target,
                    reached: self.space.num_molecules(),
                    attempts,
                });
            }
            attempts += 1;
            if let Some(seek) = &mut self.seek {
                seek.attempts = attempts;
            }
            self.attempt_trial()?;

            let done = self.space.num_molecules().abs_diff(start);
            let quarter = done * 4 / span;
            if quarter >= next_quarter {
                info!(
                    molecules = self.space.num_molecules(),
                    attempts,
                    "Seek {}% complete.",
                    quarter.min(4) * 25
                );
                next_quarter = quarter + 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::forcefield::ewald::EwaldConfig;
    use crate::core::forcefield::pair::PairConfig;
    use crate::core::models::molecule::MoleculeTemplate;
    use crate::core::models::simulation_box::SimulationBox;
    use crate::core::models::space::Space;
    use crate::engine::criteria::{Criteria, Metropolis};
    use crate::engine::error::EngineError;
    use crate::engine::mc::MonteCarlo;
    use crate::engine::trial::TrialKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use tempfile::tempdir;

    fn water_mc(initial: usize) -> MonteCarlo {
        let mut space = Space::new(SimulationBox::cubic(15.0).unwrap());
        let water = space.add_template(MoleculeTemplate::spce());
        let mut rng = ChaCha20Rng::seed_from_u64(10);
        space.fill_cubic_lattice(water, initial, &mut rng).unwrap();
        let config = PairConfig {
            r_cut: 7.5,
            ewald: EwaldConfig {
                alpha_l: 5.6,
                k2max: 38,
            },
            long_range_correction: true,
            linear_shift: false,
        };
        let criteria = Metropolis::from_temperature(298.0, 1.0).unwrap();
        let mut mc = MonteCarlo::new(space, config, criteria, 10).unwrap();
        mc.add_trial(TrialKind::Translate, 0.5, 1.0).unwrap();
        mc.add_trial(TrialKind::Rotate, 0.5, 1.0).unwrap();
        mc
    }

    #[test]
    fn seek_inserts_up_to_target_and_restores_state() {
        let mut mc = water_mc(0);
        let beta = mc.criteria().beta();
        mc.seek_molecule_count(20, 1_000_000).unwrap();
        assert_eq!(mc.space().num_molecules(), 20);
        assert_eq!(mc.trials().len(), 2);
        assert_eq!(mc.criteria().beta(), beta);
        assert_eq!(mc.attempts(), 0);
        assert_eq!(mc.pe_accumulator().count(), 0);
        let (recomputed, _) = mc.pair().compute(mc.space()).unwrap();
        assert!((mc.pair().total() - recomputed.total()).abs() < 1e-6 * recomputed.total().abs().max(1.0));
    }

    #[test]
    fn seek_deletes_down_to_target() {
        let mut mc = water_mc(8);
        mc.seek_molecule_count(3, 1_000_000).unwrap();
        assert_eq!(mc.space().num_molecules(), 3);
    }

    #[test]
    fn seek_at_target_is_a_no_op() {
        let mut mc = water_mc(4);
        mc.run_num_trials(10).unwrap();
        mc.seek_molecule_count(4, 10).unwrap();
        assert_eq!(mc.attempts(), 10);
    }

    #[test]
    fn seek_reports_failure_when_attempts_run_out() {
        let mut mc = water_mc(0);
        let result = mc.seek_molecule_count(50, 1);
        assert!(matches!(
            result,
            Err(EngineError::SeekFailed { target: 50, attempts: 1, .. })
        ));
        assert_eq!(mc.trials().len(), 2);
    }

    #[test]
    fn seek_without_registered_trials_uses_unit_weight() {
        let mut space = Space::new(SimulationBox::cubic(15.0).unwrap());
        space.add_template(MoleculeTemplate::spce());
        let config = PairConfig {
            r_cut: 7.5,
            ewald: EwaldConfig {
                alpha_l: 5.6,
                k2max: 38,
            },
            long_range_correction: false,
            linear_shift: false,
        };
        let criteria = Metropolis::from_temperature(298.0, 1.0).unwrap();
        let mut mc = MonteCarlo::new(space, config, criteria, 3).unwrap();
        mc.seek_molecule_count(5, 100_000).unwrap();
        assert_eq!(mc.space().num_molecules(), 5);
        assert!(mc.trials().is_empty());
    }

    #[test]
    fn seek_checks_energy_and_writes_resumable_restarts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seek.json");
        let mut mc = water_mc(0);
        mc.set_check_energy(10, 1e-6);
        mc.init_restart(&path, 10);
        mc.seek_molecule_count(20, 1_000_000).unwrap();
        assert!(!mc.is_seeking());
        assert!(path.exists());

        let mut resumed = MonteCarlo::from_restart(&path).unwrap();
        assert!(resumed.is_seeking());
        assert_eq!(resumed.trials().len(), 3);
        assert!(resumed.criteria().beta() < mc.criteria().beta());

        resumed.continue_seek(1_000_000).unwrap();
        assert!(!resumed.is_seeking());
        assert_eq!(resumed.trials().len(), 2);
        assert_eq!(resumed.criteria().beta(), mc.criteria().beta());
        assert_eq!(resumed.attempts(), 0);
        assert_eq!(resumed.space(), mc.space());
    }

    #[test]
    fn seek_leaves_log_to_sampling() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("seek.csv");
        let mut mc = water_mc(0);
        mc.init_log(&log, 1);
        mc.seek_molecule_count(5, 1_000_000).unwrap();
        assert!(!log.exists());
        mc.run_num_trials(3).unwrap();
        let text = std::fs::read_to_string(&log).unwrap();
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn continue_seek_without_seek_is_a_no_op() {
        let mut mc = water_mc(4);
        mc.run_num_trials(5).unwrap();
        mc.continue_seek(10).unwrap();
        assert_eq!(mc.attempts(), 5);
    }
}
