use super::config::ConfigError;
use super::criteria::CriteriaError;
use crate::core::forcefield::pair::PairError;
use crate::core::forcefield::params::ParamLoadError;
use crate::core::io::xyz::XyzError;
use crate::core::models::space::SpaceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No trials have been added to the simulation")]
    NoTrials,

    #[error("Unknown trial '{0}' (expected translate, rotate, add or delete)")]
    UnknownTrial(String),

    #[error("Trial '{trial}' is invalid: {reason}")]
    InvalidTrial { trial: String, reason: String },

    #[error("Could not reach {target} molecules within {attempts} attempts (stopped at {reached})")]
    SeekFailed {
        target: usize,
        reached: usize,
        attempts: u64,
    },

    #[error("Pair potential error: {source}")]
    Pair {
        #[from]
        source: PairError,
    },

    #[error("Configuration error: {source}")]
    Space {
        #[from]
        source: SpaceError,
    },

    #[error("Acceptance criteria error: {source}")]
    Criteria {
        #[from]
        source: CriteriaError,
    },

    #[error("Parameter loading failed: {source}")]
    Params {
        #[from]
        source: ParamLoadError,
    },

    #[error("Invalid simulation settings: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write log '{path}': {source}")]
    Log { path: String, source: csv::Error },

    #[error("Failed to write trajectory '{path}': {source}")]
    Movie { path: String, source: XyzError },

    #[error("Checkpoint '{path}' could not be (de)serialized: {source}")]
    Checkpoint {
        path: String,
        source: serde_json::Error,
    },

    #[error("Checkpoint '{path}' has format version {found}; this build reads version {expected}")]
    UnsupportedCheckpointVersion {
        path: String,
        found: u32,
        expected: u32,
    },
}
