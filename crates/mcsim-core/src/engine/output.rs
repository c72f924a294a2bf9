use super::error::EngineError;
use super::trial::Trial;
use crate::core::io::xyz;
use crate::core::models::space::Space;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub const DEFAULT_PRODUCTION_SUFFIX: &str = "_prod";

/// A file written every `frequency` trial attempts; a frequency of zero disables it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodicFile {
    pub path: PathBuf,
    pub frequency: u64,
}

impl PeriodicFile {
    pub fn new(path: impl Into<PathBuf>, frequency: u64) -> Self {
        Self {
            path: path.into(),
            frequency,
        }
    }

    #[inline]
    pub fn is_due(&self, attempts: u64) -> bool {
        self.frequency > 0 && attempts % self.frequency == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    pub log: Option<PeriodicFile>,
    pub movie: Option<PeriodicFile>,
    pub restart: Option<PeriodicFile>,
}

/// Inserts `suffix` between the file stem and the extension: `log.csv` becomes `log_prod.csv`.
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    path.with_file_name(name)
}

pub(crate) fn ensure_parent(path: &Path) -> Result<(), EngineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| EngineError::Io {
            path: parent.to_string_lossy().to_string(),
            source: e,
        })?;
    }
    Ok(())
}

fn open_append(path: &Path) -> Result<File, EngineError> {
    ensure_parent(path)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| EngineError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
}

pub fn log_header(trials: &[Trial]) -> Vec<String> {
    let mut header = vec![
        "attempts".to_string(),
        "pe_per_mol".to_string(),
        "n_mol".to_string(),
    ];
    for trial in trials {
        header.push(format!("{}_acceptance", trial.kind()));
        if trial.kind().is_tunable() {
            header.push(format!("{}_max_move", trial.kind()));
        }
    }
    header.push("config_id".to_string());
    header
}

pub fn log_record(attempts: u64, pe_per_molecule: f64, space: &Space, trials: &[Trial]) -> Vec<String> {
    let mut record = vec![
        attempts.to_string(),
        format!("{:.10}", pe_per_molecule),
        space.num_molecules().to_string(),
    ];
    for trial in trials {
        record.push(format!("{:.6}", trial.stats().acceptance()));
        if trial.kind().is_tunable() {
            record.push(format!("{:.6}", trial.max_move()));
        }
    }
    record.push(space.config_id().to_string());
    record
}

/// Appends one CSV row, writing `header` first when the file is new or empty.
pub fn append_log(path: &Path, header: &[String], record: &[String]) -> Result<(), EngineError> {
    let file = open_append(path)?;
    let is_empty = file
        .metadata()
        .map(|m| m.len() == 0)
        .map_err(|e| EngineError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
    let to_log_error = |e: csv::Error| EngineError::Log {
        path: path.to_string_lossy().to_string(),
        source: e,
    };
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if is_empty {
        writer.write_record(header).map_err(to_log_error)?;
    }
    writer.write_record(record).map_err(to_log_error)?;
    writer.flush().map_err(|e| EngineError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

/// Appends one XYZ frame of the current configuration.
pub fn append_movie(path: &Path, space: &Space, attempts: u64) -> Result<(), EngineError> {
    let mut writer = BufWriter::new(open_append(path)?);
    let comment = format!(
        "attempts={} config_id={} box={} {} {}",
        attempts,
        space.config_id(),
        space.simulation_box().lengths().x,
        space.simulation_box().lengths().y,
        space.simulation_box().lengths().z
    );
    xyz::write_frame(space, &comment, &mut writer).map_err(|e| EngineError::Movie {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::molecule::MoleculeTemplate;
    use crate::core::models::simulation_box::SimulationBox;
    use crate::engine::trial::TrialKind;
    use nalgebra::{Point3, UnitQuaternion};
    use tempfile::tempdir;

    fn trials() -> Vec<Trial> {
        vec![
            Trial::new(TrialKind::Translate, 0.1, 1.0).unwrap(),
            Trial::new(TrialKind::Add, 0.0, 1.0).unwrap(),
        ]
    }

    #[test]
    fn with_suffix_goes_before_extension() {
        assert_eq!(
            with_suffix(Path::new("out/log.csv"), "_prod"),
            PathBuf::from("out/log_prod.csv")
        );
        assert_eq!(with_suffix(Path::new("movie"), "_prod"), PathBuf::from("movie_prod"));
    }

    #[test]
    fn periodic_file_due_only_on_multiples() {
        let file = PeriodicFile::new("log.csv", 10);
        assert!(file.is_due(20));
        assert!(!file.is_due(25));
        assert!(!PeriodicFile::new("log.csv", 0).is_due(10));
    }

    #[test]
    fn log_header_lists_acceptance_and_step_columns() {
        assert_eq!(
            log_header(&trials()),
            vec![
                "attempts",
                "pe_per_mol",
                "n_mol",
                "translate_acceptance",
                "translate_max_move",
                "add_acceptance",
                "config_id"
            ]
        );
    }

    #[test]
    fn append_log_writes_header_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("log.csv");
        let space = Space::new(SimulationBox::cubic(10.0).unwrap());
        let header = log_header(&trials());
        for attempts in [10, 20] {
            let record = log_record(attempts, 0.0, &space, &trials());
            append_log(&path, &header, &record).unwrap();
        }
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("attempts,pe_per_mol"));
        assert!(lines[2].starts_with("20,"));
    }

    #[test]
    fn append_movie_writes_frames() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("movie.xyz");
        let mut space = Space::new(SimulationBox::cubic(10.0).unwrap());
        let water = space.add_template(MoleculeTemplate::spce());
        space
            .insert_molecule(water, Point3::new(1.0, 1.0, 1.0), UnitQuaternion::identity())
            .unwrap();
        append_movie(&path, &space, 0).unwrap();
        append_movie(&path, &space, 10).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 10);
        assert!(text.contains("attempts=10"));
    }
}
