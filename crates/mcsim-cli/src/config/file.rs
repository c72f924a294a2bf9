use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSystemConfig {
    pub box_length: Option<f64>,
    pub box_lengths: Option<Vec<f64>>,
    /// Built-in molecule name (e.g. `spce`), or path to a molecule TOML file or
    /// a LAMMPS data file (`data.*` or `*.data`).
    pub template: Option<String>,
    pub molecules: Option<usize>,
    pub placement: Option<String>,
    pub seek_max_attempts: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FilePotentialConfig {
    pub r_cut: Option<f64>,
    pub alpha_l: Option<f64>,
    pub k2max: Option<u32>,
    pub long_range_correction: Option<bool>,
    pub linear_shift: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileCriteriaConfig {
    pub temperature: Option<f64>,
    pub activity: Option<f64>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileTrialConfig {
    pub kind: String,
    pub max_move: f64,
    #[serde(default = "default_trial_weight")]
    pub weight: f64,
}

fn default_trial_weight() -> f64 {
    1.0
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileOutputConfig {
    pub log: Option<PathBuf>,
    pub log_frequency: Option<u64>,
    pub movie: Option<PathBuf>,
    pub movie_frequency: Option<u64>,
    pub restart: Option<PathBuf>,
    pub restart_frequency: Option<u64>,
    pub production_suffix: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileRunConfig {
    pub equilibration_trials: Option<u64>,
    pub production_trials: Option<u64>,
    pub tune_frequency: Option<u64>,
    pub check_energy_frequency: Option<u64>,
    pub check_energy_tolerance: Option<f64>,
    pub seed: Option<u64>,
    pub block_size: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileReferenceConfig {
    pub pe_per_molecule: Option<f64>,
    pub stdev: Option<f64>,
    pub z: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub system: Option<FileSystemConfig>,
    pub potential: Option<FilePotentialConfig>,
    pub criteria: Option<FileCriteriaConfig>,
    #[serde(default, rename = "trial")]
    pub trials: Vec<FileTrialConfig>,
    pub output: Option<FileOutputConfig>,
    pub run: Option<FileRunConfig>,
    pub reference: Option<FileReferenceConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_sections() {
        let toml = r#"
            [system]
            box-length = 24.8586887
            template = "spce"
            molecules = 512
            placement = "lattice"

            [potential]
            alpha-l = 5.6
            k2max = 38

            [criteria]
            temperature = 298.0

            [[trial]]
            kind = "translate"
            max-move = 0.1

            [[trial]]
            kind = "rotate"
            max-move = 0.1
            weight = 2.0

            [output]
            log = "spce.csv"
            log-frequency = 10000

            [run]
            equilibration-trials = 1000000
            production-trials = 1000000
            seed = 7

            [reference]
            pe-per-molecule = -46.82
            stdev = 0.02
        "#;
        let config: FileConfig = toml::from_str(toml).unwrap();
        let system = config.system.unwrap();
        assert_eq!(system.box_length, Some(24.8586887));
        assert_eq!(system.placement.as_deref(), Some("lattice"));
        assert_eq!(config.potential.unwrap().k2max, Some(38));
        assert_eq!(config.trials.len(), 2);
        assert_eq!(config.trials[0].weight, 1.0);
        assert_eq!(config.trials[1].weight, 2.0);
        assert_eq!(config.run.unwrap().seed, Some(7));
        assert_eq!(config.reference.unwrap().pe_per_molecule, Some(-46.82));
    }

    #[test]
    fn rejects_unknown_keys() {
        let toml = r#"
            [potential]
            alpha = 5.6
        "#;
        assert!(toml::from_str::<FileConfig>(toml).is_err());
    }
}
