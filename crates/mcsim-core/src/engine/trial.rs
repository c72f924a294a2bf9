use super::criteria::Criteria;
use super::error::EngineError;
use crate::core::forcefield::pair::PairLjCoulEwald;
use crate::core::models::space::Space;
use crate::core::utils::geometry::{random_displacement, random_orientation, random_rotation};
use nalgebra::Point3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

pub const TARGET_ACCEPTANCE: f64 = 0.25;
const TUNE_FACTOR: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrialKind {
    Translate,
    Rotate,
    Add,
    Delete,
}

impl TrialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Translate => "translate",
            Self::Rotate => "rotate",
            Self::Add => "add",
            Self::Delete => "delete",
        }
    }

    /// Whether the trial has a step size that tuning adjusts.
    pub fn is_tunable(&self) -> bool {
        matches!(self, Self::Translate | Self::Rotate)
    }
}

impl fmt::Display for TrialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrialKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "translate" => Ok(Self::Translate),
            "rotate" => Ok(Self::Rotate),
            "add" => Ok(Self::Add),
            "delete" => Ok(Self::Delete),
            _ => Err(EngineError::UnknownTrial(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrialStats {
    pub attempted: u64,
    pub accepted: u64,
    window_attempted: u64,
    window_accepted: u64,
}

impl TrialStats {
    fn record(&mut self, accepted: bool) {
        self.attempted += 1;
        self.window_attempted += 1;
        if accepted {
            self.accepted += 1;
            self.window_accepted += 1;
        }
    }

    pub fn acceptance(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.accepted as f64 / self.attempted as f64
        }
    }

    /// Acceptance since the last tuning, `None` if nothing was attempted since.
    pub fn window_acceptance(&self) -> Option<f64> {
        (self.window_attempted > 0)
            .then(|| self.window_accepted as f64 / self.window_attempted as f64)
    }

    fn reset_window(&mut self) {
        self.window_attempted = 0;
        self.window_accepted = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialOutcome {
    Accepted,
    Rejected,
    /// Not attempted because the molecule-count target was already met.
    Skipped,
}

/// A Monte Carlo move with its step size, selection weight and statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    kind: TrialKind,
    /// Å for translations, radians for rotations; unused by insertions and deletions.
    max_move: f64,
    weight: f64,
    template: usize,
    stats: TrialStats,
    #[serde(skip)]
    seek_target: Option<usize>,
}

impl Trial {
    pub fn new(kind: TrialKind, max_move: f64, weight: f64) -> Result<Self, EngineError> {
        let invalid = |reason: &str| EngineError::InvalidTrial {
            trial: kind.to_string(),
            reason: reason.to_string(),
        };
        if !(weight.is_finite() && weight > 0.0) {
            return Err(invalid("weight must be positive"));
        }
        if kind.is_tunable() && !(max_move.is_finite() && max_move > 0.0) {
            return Err(invalid("maximum move must be positive"));
        }
        Ok(Self {
            kind,
            max_move,
            weight,
            template: 0,
            stats: TrialStats::default(),
            seek_target: None,
        })
    }

    /// Sets the molecule template inserted or deleted by this trial.
    pub fn with_template(mut self, template: usize) -> Self {
        self.template = template;
        self
    }

    #[inline]
    pub fn kind(&self) -> TrialKind {
        self.kind
    }

    #[inline]
    pub fn max_move(&self) -> f64 {
        self.max_move
    }

    pub fn set_max_move(&mut self, max_move: f64) {
        self.max_move = max_move;
    }

    #[inline]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    #[inline]
    pub fn template(&self) -> usize {
        self.template
    }

    #[inline]
    pub fn stats(&self) -> &TrialStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = TrialStats::default();
    }

    /// While seeking, insertions stop at `target` molecules and deletions at or below it.
    pub fn initialize_seek(&mut self, target: usize) {
        self.seek_target = Some(target);
    }

    pub fn clear_seek(&mut self) {
        self.seek_target = None;
    }

    /// Scales the step size towards the target acceptance and starts a new window.
    /// `max_translate` caps translations (half the shortest cell edge).
    pub fn tune(&mut self, max_translate: f64) {
        if let Some(rate) = self.stats.window_acceptance() {
            let factor = if rate < TARGET_ACCEPTANCE {
                1.0 - TUNE_FACTOR
            } else {
                1.0 + TUNE_FACTOR
            };
            match self.kind {
                TrialKind::Translate => {
                    self.max_move = (self.max_move * factor).min(max_translate)
                }
                TrialKind::Rotate => self.max_move = (self.max_move * factor).min(PI),
                TrialKind::Add | TrialKind::Delete => {}
            }
        }
        self.stats.reset_window();
    }

    pub fn attempt<R: Rng>(
        &mut self,
        space: &mut Space,
        pair: &mut PairLjCoulEwald,
        criteria: &dyn Criteria,
        rng: &mut R,
    ) -> Result<TrialOutcome, EngineError> {
        if let Some(target) = self.seek_target {
            let count = space.num_molecules_of(self.template);
            let blocked = match self.kind {
                TrialKind::Add => count >= target,
                TrialKind::Delete => count <= target,
                _ => false,
            };
            if blocked {
                return Ok(TrialOutcome::Skipped);
            }
        }

        let accepted = match self.kind {
            TrialKind::Translate => self.attempt_translate(space, pair, criteria, rng)?,
            TrialKind::Rotate => self.attempt_rotate(space, pair, criteria, rng)?,
            TrialKind::Add => self.attempt_add(space, pair, criteria, rng)?,
            TrialKind::Delete => self.attempt_delete(space, pair, criteria, rng)?,
        };
        self.stats.record(accepted);
        Ok(if accepted {
            TrialOutcome::Accepted
        } else {
            TrialOutcome::Rejected
        })
    }

    fn attempt_translate<R: Rng>(
        &self,
        space: &mut Space,
        pair: &mut PairLjCoulEwald,
        criteria: &dyn Criteria,
        rng: &mut R,
    ) -> Result<bool, EngineError> {
        let n = space.num_molecules();
        if n == 0 {
            return Ok(false);
        }
        let index = rng.gen_range(0..n);
        let molecule = space.molecule(index)?;
        let position = molecule.position + random_displacement(self.max_move, rng);
        let offsets = molecule.offsets.clone();
        let change = pair.propose_displacement(space, index, &position, &offsets)?;
        let ln_p = -criteria.beta() * change.delta.total();
        if criteria.accept(ln_p, rng) {
            space.set_pose(index, position, offsets)?;
            pair.commit(change);
            return Ok(true);
        }
        Ok(false)
    }

    fn attempt_rotate<R: Rng>(
        &self,
        space: &mut Space,
        pair: &mut PairLjCoulEwald,
        criteria: &dyn Criteria,
        rng: &mut R,
    ) -> Result<bool, EngineError> {
        let n = space.num_molecules();
        if n == 0 {
            return Ok(false);
        }
        let index = rng.gen_range(0..n);
        let molecule = space.molecule(index)?;
        let rotation = random_rotation(self.max_move, rng);
        let position = molecule.position;
        let offsets: Vec<_> = molecule.offsets.iter().map(|o| rotation * o).collect();
        let change = pair.propose_displacement(space, index, &position, &offsets)?;
        let ln_p = -criteria.beta() * change.delta.total();
        if criteria.accept(ln_p, rng) {
            space.set_pose(index, position, offsets)?;
            pair.commit(change);
            return Ok(true);
        }
        Ok(false)
    }

    fn attempt_add<R: Rng>(
        &self,
        space: &mut Space,
        pair: &mut PairLjCoulEwald,
        criteria: &dyn Criteria,
        rng: &mut R,
    ) -> Result<bool, EngineError> {
        let lengths = *space.simulation_box().lengths();
        let position = Point3::new(
            rng.r#gen::<f64>() * lengths.x,
            rng.r#gen::<f64>() * lengths.y,
            rng.r#gen::<f64>() * lengths.z,
        );
        let orientation = random_orientation(rng);
        let molecule = space.build_molecule(self.template, position, &orientation)?;
        let change = pair.propose_insertion(space, &molecule)?;

        let n = space.num_molecules_of(self.template) as f64;
        let volume = space.simulation_box().volume();
        let ln_p = (criteria.activity() * volume / (n + 1.0)).ln()
            - criteria.beta() * change.delta.total();
        if criteria.accept(ln_p, rng) {
            space.add_molecule(molecule)?;
            pair.commit(change);
            return Ok(true);
        }
        Ok(false)
    }

    fn attempt_delete<R: Rng>(
        &self,
        space: &mut Space,
        pair: &mut PairLjCoulEwald,
        criteria: &dyn Criteria,
        rng: &mut R,
    ) -> Result<bool, EngineError> {
        let candidates: Vec<usize> = space
            .molecules()
            .iter()
            .enumerate()
            .filter(|(_, m)| m.template == self.template)
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            return Ok(false);
        }
        let index = candidates[rng.gen_range(0..candidates.len())];
        let change = pair.propose_removal(space, index)?;

        let n = candidates.len() as f64;
        let volume = space.simulation_box().volume();
        let ln_p = (n / (criteria.activity() * volume)).ln() - criteria.beta() * change.delta.total();
        if criteria.accept(ln_p, rng) {
            space.remove_molecule(index)?;
            pair.commit(change);
            return Ok(true);
        }
        Ok(false)
    }
}
