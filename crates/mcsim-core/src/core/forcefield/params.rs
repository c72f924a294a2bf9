use crate::core::models::molecule::{MoleculeTemplate, Site};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
struct SiteParam {
    name: String,
    #[serde(rename = "type")]
    site_type: String,
    #[serde(default)]
    epsilon: f64,
    #[serde(default)]
    sigma: f64,
    #[serde(default)]
    charge: f64,
    position: [f64; 3],
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
struct MoleculeFile {
    name: String,
    #[serde(rename = "site")]
    sites: Vec<SiteParam>,
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid molecule definition in '{path}': {reason}")]
    Invalid { path: String, reason: String },
    #[error("Unknown built-in molecule '{0}'")]
    UnknownBuiltin(String),
}

/// Where a molecule template comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateSource {
    Builtin(String),
    File(PathBuf),
    /// A LAMMPS data file holding a single molecule.
    Lammps(PathBuf),
}

impl TemplateSource {
    pub fn load(&self) -> Result<MoleculeTemplate, ParamLoadError> {
        match self {
            Self::Builtin(name) => builtin_template(name),
            Self::File(path) => load_template(path),
            Self::Lammps(path) => load_lammps_template(path),
        }
    }
}

pub fn builtin_template(name: &str) -> Result<MoleculeTemplate, ParamLoadError> {
    match name.to_ascii_lowercase().as_str() {
        "spce" | "spc/e" => Ok(MoleculeTemplate::spce()),
        _ => Err(ParamLoadError::UnknownBuiltin(name.to_string())),
    }
}

/// Reads a rigid molecule definition from a TOML file with one `[[site]]` table per site.
pub fn load_template(path: &Path) -> Result<MoleculeTemplate, ParamLoadError> {
    let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    parse_template(&content, &path.to_string_lossy())
}

fn parse_template(content: &str, origin: &str) -> Result<MoleculeTemplate, ParamLoadError> {
    let file: MoleculeFile = toml::from_str(content).map_err(|e| ParamLoadError::Toml {
        path: origin.to_string(),
        source: e,
    })?;
    let invalid = |reason: String| ParamLoadError::Invalid {
        path: origin.to_string(),
        reason,
    };

    let sites: Vec<Site> = file
        .sites
        .into_iter()
        .map(|s| Site {
            name: s.name,
            site_type: s.site_type,
            epsilon: s.epsilon,
            sigma: s.sigma,
            charge: s.charge,
            position: Vector3::from(s.position),
        })
        .collect();
    validate_sites(&sites).map_err(invalid)?;
    Ok(MoleculeTemplate::new(&file.name, sites))
}

fn validate_sites(sites: &[Site]) -> Result<(), String> {
    if sites.is_empty() {
        return Err("a molecule needs at least one site".to_string());
    }
    for site in sites {
        if site.epsilon < 0.0 || site.sigma < 0.0 {
            return Err(format!("site '{}' has a negative epsilon or sigma", site.name));
        }
        if site.epsilon > 0.0 && site.sigma == 0.0 {
            return Err(format!(
                "site '{}' has a non-zero epsilon but zero sigma",
                site.name
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LammpsSection {
    Header,
    Masses,
    PairCoeffs,
    Atoms,
    Skipped,
}

#[derive(Debug, Clone)]
struct LammpsAtom {
    id: usize,
    molecule: usize,
    atom_type: usize,
    charge: f64,
    position: Vector3<f64>,
}

/// Reads a rigid molecule from a LAMMPS data file.
///
/// Only the header counts and the `Masses`, `Pair Coeffs` and `Atoms` sections
/// are used; bonded sections are skipped. `Pair Coeffs` lines are
/// `type epsilon sigma` with epsilon in kJ/mol, `Atoms` lines are
/// `id molecule type charge x y z`. A comment after a `Masses` line names the
/// atom type. The template is called after the file, `data.spce` giving `spce`.
pub fn load_lammps_template(path: &Path) -> Result<MoleculeTemplate, ParamLoadError> {
    let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match file_name.strip_prefix("data.") {
        Some(rest) => rest.to_string(),
        None => path
            .file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file_name.clone()),
    };
    parse_lammps_data(&content, &name, &path.to_string_lossy())
}

fn parse_field<T: FromStr>(fields: &[&str], index: usize, what: &str) -> Result<T, String> {
    let field = fields
        .get(index)
        .ok_or_else(|| format!("missing {}", what))?;
    field
        .parse()
        .map_err(|_| format!("invalid {} '{}'", what, field))
}

fn parse_lammps_data(content: &str, name: &str, origin: &str) -> Result<MoleculeTemplate, ParamLoadError> {
    let invalid = |reason: String| ParamLoadError::Invalid {
        path: origin.to_string(),
        reason,
    };

    let mut section = LammpsSection::Header;
    let mut num_atoms: Option<usize> = None;
    let mut num_types: Option<usize> = None;
    let mut labels: HashMap<usize, String> = HashMap::new();
    let mut coeffs: HashMap<usize, (f64, f64)> = HashMap::new();
    let mut atoms: Vec<LammpsAtom> = Vec::new();

    // The first line is a free-form title.
    for (index, raw) in content.lines().enumerate().skip(1) {
        let line_no = index + 1;
        let at_line = |reason: String| invalid(format!("line {}: {}", line_no, reason));
        let (data, comment) = match raw.split_once('#') {
            Some((data, comment)) => (data.trim(), comment.trim()),
            None => (raw.trim(), ""),
        };
        if data.is_empty() {
            continue;
        }
        let fields: Vec<&str> = data.split_whitespace().collect();
        if fields[0].parse::<f64>().is_err() {
            section = match data {
                "Masses" => LammpsSection::Masses,
                "Pair Coeffs" => LammpsSection::PairCoeffs,
                "Atoms" => LammpsSection::Atoms,
                _ => LammpsSection::Skipped,
            };
            continue;
        }

        match section {
            LammpsSection::Header => {
                let keyword = fields[1..].join(" ");
                if keyword == "atoms" {
                    num_atoms = Some(parse_field(&fields, 0, "atom count").map_err(at_line)?);
                } else if keyword == "atom types" {
                    num_types = Some(parse_field(&fields, 0, "atom type count").map_err(at_line)?);
                }
            }
            LammpsSection::Masses => {
                let atom_type: usize = parse_field(&fields, 0, "atom type").map_err(at_line)?;
                if let Some(label) = comment.split_whitespace().next() {
                    labels.insert(atom_type, label.to_string());
                }
            }
            LammpsSection::PairCoeffs => {
                let atom_type = parse_field(&fields, 0, "atom type").map_err(at_line)?;
                let epsilon = parse_field(&fields, 1, "epsilon").map_err(at_line)?;
                let sigma = parse_field(&fields, 2, "sigma").map_err(at_line)?;
                coeffs.insert(atom_type, (epsilon, sigma));
            }
            LammpsSection::Atoms => {
                let mut position = [0.0; 3];
                for (axis, coordinate) in position.iter_mut().enumerate() {
                    *coordinate = parse_field(&fields, 4 + axis, "coordinate").map_err(at_line)?;
                }
                atoms.push(LammpsAtom {
                    id: parse_field(&fields, 0, "atom id").map_err(at_line)?,
                    molecule: parse_field(&fields, 1, "molecule id").map_err(at_line)?,
                    atom_type: parse_field(&fields, 2, "atom type").map_err(at_line)?,
                    charge: parse_field(&fields, 3, "charge").map_err(at_line)?,
                    position: Vector3::from(position),
                });
            }
            LammpsSection::Skipped => {}
        }
    }

    if let Some(expected) = num_atoms {
        if expected != atoms.len() {
            return Err(invalid(format!(
                "header declares {} atoms but the Atoms section lists {}",
                expected,
                atoms.len()
            )));
        }
    }
    atoms.sort_by_key(|atom| atom.id);
    if let Some(first) = atoms.first() {
        if atoms.iter().any(|atom| atom.molecule != first.molecule) {
            return Err(invalid("only single-molecule data files are supported".to_string()));
        }
    }

    let mut label_counts: HashMap<String, usize> = HashMap::new();
    let mut resolved = Vec::with_capacity(atoms.len());
    for atom in &atoms {
        if num_types.is_some_and(|n| atom.atom_type == 0 || atom.atom_type > n) {
            return Err(invalid(format!("atom {} has undeclared type {}", atom.id, atom.atom_type)));
        }
        let &(epsilon, sigma) = coeffs
            .get(&atom.atom_type)
            .ok_or_else(|| invalid(format!("no Pair Coeffs for atom type {}", atom.atom_type)))?;
        let label = labels
            .get(&atom.atom_type)
            .cloned()
            .unwrap_or_else(|| format!("T{}", atom.atom_type));
        *label_counts.entry(label.clone()).or_default() += 1;
        resolved.push((atom, label, epsilon, sigma));
    }

    let origin_position = atoms.first().map(|a| a.position).unwrap_or_else(Vector3::zeros);
    let mut ordinals: HashMap<String, usize> = HashMap::new();
    let sites: Vec<Site> = resolved
        .into_iter()
        .map(|(atom, label, epsilon, sigma)| {
            let site_name = if label_counts[&label] > 1 {
                let ordinal = ordinals.entry(label.clone()).or_default();
                *ordinal += 1;
                format!("{}{}", label, ordinal)
            } else {
                label.clone()
            };
            Site {
                name: site_name,
                site_type: label,
                epsilon,
                sigma,
                charge: atom.charge,
                position: atom.position - origin_position,
            }
        })
        .collect();
    validate_sites(&sites).map_err(invalid)?;
    Ok(MoleculeTemplate::new(name, sites))
}
