use super::accumulator::DEFAULT_BLOCK_SIZE;
use super::output::DEFAULT_PRODUCTION_SUFFIX;
use super::trial::TrialKind;
use crate::core::forcefield::ewald::EwaldConfig;
use crate::core::forcefield::params::TemplateSource;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub const DEFAULT_SEEK_MAX_ATTEMPTS: u64 = 100_000_000;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Seed of the simulation's random number generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Seed {
    /// Derived from the wall clock; every run differs.
    #[default]
    FromTime,
    Fixed(u64),
}

impl Seed {
    pub fn resolve(&self) -> u64 {
        match self {
            Self::Fixed(seed) => *seed,
            Self::FromTime => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() ^ u64::from(d.subsec_nanos()))
                .unwrap_or(0),
        }
    }
}

/// Periodic comparison of the running energy against a full recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyCheck {
    pub frequency: u64,
    pub tolerance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialConfig {
    pub kind: TrialKind,
    pub max_move: f64,
    pub weight: f64,
}

/// How the initial configuration reaches the requested molecule count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InitialPlacement {
    /// Grand-canonical insertions at a quarter of the inverse temperature.
    #[default]
    Seek,
    /// Simple cubic lattice with random orientations, then seek for any remainder.
    Lattice,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub log: Option<PathBuf>,
    pub log_frequency: u64,
    pub movie: Option<PathBuf>,
    pub movie_frequency: u64,
    pub restart: Option<PathBuf>,
    pub restart_frequency: u64,
    pub production_suffix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NvtConfig {
    pub box_lengths: Vec<f64>,
    pub template: TemplateSource,
    /// Defaults to half the shortest cell edge when `None`.
    pub r_cut: Option<f64>,
    pub ewald: EwaldConfig,
    pub long_range_correction: bool,
    /// Shift Lennard-Jones energies and forces to zero at the cutoff.
    pub linear_shift: bool,
    pub temperature: f64,
    pub activity: f64,
    pub molecules: usize,
    pub placement: InitialPlacement,
    pub seek_max_attempts: u64,
    pub trials: Vec<TrialConfig>,
    pub output: OutputConfig,
    pub tune_frequency: u64,
    pub check_energy: Option<EnergyCheck>,
    pub equilibration_trials: u64,
    pub production_trials: u64,
    pub seed: Seed,
    pub block_size: u64,
}

#[derive(Default)]
pub struct NvtConfigBuilder {
    box_lengths: Option<Vec<f64>>,
    template: Option<TemplateSource>,
    r_cut: Option<f64>,
    alpha_l: Option<f64>,
    k2max: Option<u32>,
    long_range_correction: Option<bool>,
    linear_shift: Option<bool>,
    temperature: Option<f64>,
    activity: Option<f64>,
    molecules: Option<usize>,
    placement: Option<InitialPlacement>,
    seek_max_attempts: Option<u64>,
    trials: Vec<TrialConfig>,
    output: Option<OutputConfig>,
    tune_frequency: Option<u64>,
    check_energy: Option<EnergyCheck>,
    equilibration_trials: Option<u64>,
    production_trials: Option<u64>,
    seed: Option<Seed>,
    block_size: Option<u64>,
}

impl NvtConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn box_length(mut self, length: f64) -> Self {
        self.box_lengths = Some(vec![length; 3]);
        self
    }
    pub fn box_lengths(mut self, lengths: Vec<f64>) -> Self {
        self.box_lengths = Some(lengths);
        self
    }
    pub fn template(mut self, source: TemplateSource) -> Self {
        self.template = Some(source);
        self
    }
    pub fn r_cut(mut self, r_cut: f64) -> Self {
        self.r_cut = Some(r_cut);
        self
    }
    pub fn alpha_l(mut self, alpha_l: f64) -> Self {
        self.alpha_l = Some(alpha_l);
        self
    }
    pub fn k2max(mut self, k2max: u32) -> Self {
        self.k2max = Some(k2max);
        self
    }
    pub fn long_range_correction(mut self, enabled: bool) -> Self {
        self.long_range_correction = Some(enabled);
        self
    }
    pub fn linear_shift(mut self, enabled: bool) -> Self {
        self.linear_shift = Some(enabled);
        self
    }
    pub fn temperature(mut self, kelvin: f64) -> Self {
        self.temperature = Some(kelvin);
        self
    }
    pub fn activity(mut self, activity: f64) -> Self {
        self.activity = Some(activity);
        self
    }
    pub fn molecules(mut self, count: usize) -> Self {
        self.molecules = Some(count);
        self
    }
    pub fn placement(mut self, placement: InitialPlacement) -> Self {
        self.placement = Some(placement);
        self
    }
    pub fn seek_max_attempts(mut self, attempts: u64) -> Self {
        self.seek_max_attempts = Some(attempts);
        self
    }
    pub fn trial(mut self, kind: TrialKind, max_move: f64, weight: f64) -> Self {
        self.trials.push(TrialConfig {
            kind,
            max_move,
            weight,
        });
        self
    }
    pub fn output(mut self, output: OutputConfig) -> Self {
        self.output = Some(output);
        self
    }
    pub fn tune_frequency(mut self, frequency: u64) -> Self {
        self.tune_frequency = Some(frequency);
        self
    }
    pub fn check_energy(mut self, frequency: u64, tolerance: f64) -> Self {
        self.check_energy = Some(EnergyCheck {
            frequency,
            tolerance,
        });
        self
    }
    pub fn equilibration_trials(mut self, n: u64) -> Self {
        self.equilibration_trials = Some(n);
        self
    }
    pub fn production_trials(mut self, n: u64) -> Self {
        self.production_trials = Some(n);
        self
    }
    pub fn seed(mut self, seed: Seed) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn block_size(mut self, size: u64) -> Self {
        self.block_size = Some(size);
        self
    }

    pub fn build(self) -> Result<NvtConfig, ConfigError> {
        if self.trials.is_empty() {
            return Err(ConfigError::MissingParameter("trials"));
        }
        let temperature = self
            .temperature
            .ok_or(ConfigError::MissingParameter("temperature"))?;
        if !(temperature.is_finite() && temperature > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "temperature",
                reason: format!("must be positive, got {}", temperature),
            });
        }
        let mut output = self.output.unwrap_or_default();
        if output.production_suffix.is_empty() {
            output.production_suffix = DEFAULT_PRODUCTION_SUFFIX.to_string();
        }

        Ok(NvtConfig {
            box_lengths: self
                .box_lengths
                .ok_or(ConfigError::MissingParameter("box_lengths"))?,
            template: self
                .template
                .unwrap_or_else(|| TemplateSource::Builtin("spce".to_string())),
            r_cut: self.r_cut,
            ewald: EwaldConfig {
                alpha_l: self.alpha_l.ok_or(ConfigError::MissingParameter("alpha_l"))?,
                k2max: self.k2max.ok_or(ConfigError::MissingParameter("k2max"))?,
            },
            long_range_correction: self.long_range_correction.unwrap_or(true),
            linear_shift: self.linear_shift.unwrap_or(false),
            temperature,
            activity: self.activity.unwrap_or(1.0),
            molecules: self
                .molecules
                .ok_or(ConfigError::MissingParameter("molecules"))?,
            placement: self.placement.unwrap_or_default(),
            seek_max_attempts: self.seek_max_attempts.unwrap_or(DEFAULT_SEEK_MAX_ATTEMPTS),
            trials: self.trials,
            output,
            tune_frequency: self.tune_frequency.unwrap_or(0),
            check_energy: self.check_energy,
            equilibration_trials: self
                .equilibration_trials
                .ok_or(ConfigError::MissingParameter("equilibration_trials"))?,
            production_trials: self
                .production_trials
                .ok_or(ConfigError::MissingParameter("production_trials"))?,
            seed: self.seed.unwrap_or_default(),
            block_size: self.block_size.unwrap_or(DEFAULT_BLOCK_SIZE),
        })
    }
}
