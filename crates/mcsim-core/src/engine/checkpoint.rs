use super::accumulator::Accumulator;
use super::config::EnergyCheck;
use super::criteria::AcceptanceCriteria;
use super::error::EngineError;
use super::output::{OutputSettings, ensure_parent};
use super::seek::SeekState;
use super::trial::Trial;
use crate::core::forcefield::pair::PairConfig;
use crate::core::models::space::Space;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CHECKPOINT_VERSION: u32 = 1;

/// Everything needed to continue a simulation exactly where it stopped. The
/// energy is not stored; it is recomputed from the configuration on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub space: Space,
    pub pair: PairConfig,
    pub criteria: AcceptanceCriteria,
    pub trials: Vec<Trial>,
    pub attempts: u64,
    pub rng: ChaCha20Rng,
    pub pe: Accumulator,
    pub n_mol: Accumulator,
    pub output: OutputSettings,
    pub tune_frequency: u64,
    pub check_energy: Option<EnergyCheck>,
    pub production: bool,
    pub production_suffix: String,
    /// Present when the checkpoint was written while seeking a molecule count.
    #[serde(default)]
    pub seek: Option<SeekState>,
}

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

/// `restart.json` becomes `restart.json.bak`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

impl Checkpoint {
    /// Writes the checkpoint as JSON, moving an existing file at `path` to its backup first.
    pub fn store(&self, path: &Path) -> Result<(), EngineError> {
        let io_error = |p: &Path, e: std::io::Error| EngineError::Io {
            path: p.to_string_lossy().to_string(),
            source: e,
        };
        ensure_parent(path)?;
        if path.exists() {
            let backup = backup_path(path);
            fs::rename(path, &backup).map_err(|e| io_error(&backup, e))?;
        }
        let file = File::create(path).map_err(|e| io_error(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self).map_err(|e| EngineError::Checkpoint {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        writer.flush().map_err(|e| io_error(path, e))?;
        debug!(path = %path.display(), attempts = self.attempts, "Wrote checkpoint.");
        Ok(())
    }

    /// Reads a checkpoint, refusing files written in another format version.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let content = fs::read_to_string(path).map_err(|e| EngineError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let parse_error = |e: serde_json::Error| EngineError::Checkpoint {
            path: path.to_string_lossy().to_string(),
            source: e,
        };
        let header: VersionHeader = serde_json::from_str(&content).map_err(parse_error)?;
        if header.version != CHECKPOINT_VERSION {
            return Err(EngineError::UnsupportedCheckpointVersion {
                path: path.to_string_lossy().to_string(),
                found: header.version,
                expected: CHECKPOINT_VERSION,
            });
        }
        serde_json::from_str(&content).map_err(parse_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_path_appends_extension() {
        assert_eq!(
            backup_path(Path::new("out/restart.json")),
            PathBuf::from("out/restart.json.bak")
        );
    }

    #[test]
    fn load_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Checkpoint::load(&dir.path().join("absent.json")),
            Err(EngineError::Io { .. })
        ));
    }

    #[test]
    fn load_fails_for_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Checkpoint::load(&path),
            Err(EngineError::Checkpoint { .. })
        ));
    }

    #[test]
    fn load_rejects_other_format_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.json");
        fs::write(&path, r#"{"version": 99, "space": null}"#).unwrap();
        match Checkpoint::load(&path) {
            Err(EngineError::UnsupportedCheckpointVersion {
                found, expected, ..
            }) => {
                assert_eq!(found, 99);
                assert_eq!(expected, CHECKPOINT_VERSION);
            }
            other => panic!("unexpected load outcome: {other:?}"),
        }
    }
}
