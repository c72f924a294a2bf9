use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileOutputConfig, FileReferenceConfig};
use super::models::{AppConfig, ReferenceConfig};
use crate::cli::RunOverrides;
use crate::error::{CliError, Result};
use mcsim::core::forcefield::params::TemplateSource;
use mcsim::engine::config::{self as core_config, InitialPlacement, OutputConfig, Seed};
use mcsim::engine::trial::TrialKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub fn build_config(
    config_path: &Path,
    overrides: &RunOverrides,
    set_values: &[String],
) -> Result<AppConfig> {
    let file_config = FileConfig::from_file(config_path)?;
    let base_dir = config_path.parent().unwrap_or(Path::new(""));
    merge_config(file_config, base_dir, overrides, set_values)
}

/// Combines file values, `-S` assignments and command-line overrides, in increasing
/// precedence, on top of [`DefaultsConfig`]. Relative paths are resolved against `base_dir`.
pub fn merge_config(
    file_config: FileConfig,
    base_dir: &Path,
    overrides: &RunOverrides,
    set_values: &[String],
) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = apply_set_values(file_config, set_values)?;

    let system = file_config.system.take().unwrap_or_default();
    let potential = file_config.potential.take().unwrap_or_default();
    let criteria = file_config.criteria.take().unwrap_or_default();
    let run = file_config.run.take().unwrap_or_default();

    let mut builder = core_config::NvtConfigBuilder::new()
        .template(resolve_template(
            system.template.as_deref().unwrap_or(&defaults.template),
            base_dir,
        ))
        .placement(parse_placement(
            system.placement.as_deref().unwrap_or(&defaults.placement),
        )?)
        .long_range_correction(
            potential
                .long_range_correction
                .unwrap_or(defaults.long_range_correction),
        )
        .linear_shift(potential.linear_shift.unwrap_or(defaults.linear_shift))
        .temperature(criteria.temperature.unwrap_or(defaults.temperature))
        .activity(criteria.activity.unwrap_or(defaults.activity))
        .output(merge_output(file_config.output.take(), base_dir, &defaults));

    builder = match (system.box_lengths, system.box_length) {
        (Some(lengths), _) => builder.box_lengths(lengths),
        (None, Some(length)) => builder.box_length(length),
        (None, None) => builder,
    };
    if let Some(molecules) = overrides.molecules.or(system.molecules) {
        builder = builder.molecules(molecules);
    }
    if let Some(attempts) = system.seek_max_attempts {
        builder = builder.seek_max_attempts(attempts);
    }
    if let Some(r_cut) = potential.r_cut {
        builder = builder.r_cut(r_cut);
    }
    if let Some(alpha_l) = potential.alpha_l {
        builder = builder.alpha_l(alpha_l);
    }
    if let Some(k2max) = potential.k2max {
        builder = builder.k2max(k2max);
    }
    for trial in &file_config.trials {
        let kind = TrialKind::from_str(&trial.kind).map_err(|e| CliError::Config(e.to_string()))?;
        builder = builder.trial(kind, trial.max_move, trial.weight);
    }
    if let Some(n) = overrides.equilibration.or(run.equilibration_trials) {
        builder = builder.equilibration_trials(n);
    }
    if let Some(n) = overrides.production.or(run.production_trials) {
        builder = builder.production_trials(n);
    }
    if let Some(frequency) = run.tune_frequency {
        builder = builder.tune_frequency(frequency);
    }
    if let Some(frequency) = run.check_energy_frequency.filter(|&f| f > 0) {
        builder = builder.check_energy(
            frequency,
            run.check_energy_tolerance
                .unwrap_or(defaults.check_energy_tolerance),
        );
    }
    if let Some(block_size) = run.block_size {
        builder = builder.block_size(block_size);
    }
    builder = builder.seed(
        overrides
            .seed
            .or(run.seed)
            .map(Seed::Fixed)
            .unwrap_or(Seed::FromTime),
    );

    let core_config = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(AppConfig {
        core_config,
        reference: merge_reference(file_config.reference.take(), &defaults)?,
    })
}

fn resolve_template(name_or_path: &str, base_dir: &Path) -> TemplateSource {
    let is_lammps_data = Path::new(name_or_path)
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("data.") || name.ends_with(".data"));
    let looks_like_path = name_or_path.contains(['/', '\\']) || name_or_path.ends_with(".toml");
    if is_lammps_data {
        TemplateSource::Lammps(resolve_path(Path::new(name_or_path), base_dir))
    } else if looks_like_path {
        TemplateSource::File(resolve_path(Path::new(name_or_path), base_dir))
    } else {
        TemplateSource::Builtin(name_or_path.to_string())
    }
}

fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn parse_placement(value: &str) -> Result<InitialPlacement> {
    match value {
        "seek" => Ok(InitialPlacement::Seek),
        "lattice" => Ok(InitialPlacement::Lattice),
        other => Err(CliError::Config(format!(
            "Unknown placement '{}'. Expected 'seek' or 'lattice'.",
            other
        ))),
    }
}

fn merge_output(
    file_val: Option<FileOutputConfig>,
    base_dir: &Path,
    defaults: &DefaultsConfig,
) -> OutputConfig {
    let file_val = file_val.unwrap_or_default();
    OutputConfig {
        log: file_val.log.map(|p| resolve_path(&p, base_dir)),
        log_frequency: file_val.log_frequency.unwrap_or(defaults.log_frequency),
        movie: file_val.movie.map(|p| resolve_path(&p, base_dir)),
        movie_frequency: file_val.movie_frequency.unwrap_or(defaults.movie_frequency),
        restart: file_val.restart.map(|p| resolve_path(&p, base_dir)),
        restart_frequency: file_val
            .restart_frequency
            .unwrap_or(defaults.restart_frequency),
        production_suffix: file_val.production_suffix.unwrap_or_default(),
    }
}

fn merge_reference(
    file_val: Option<FileReferenceConfig>,
    defaults: &DefaultsConfig,
) -> Result<Option<ReferenceConfig>> {
    let Some(file_val) = file_val else {
        return Ok(None);
    };
    let pe_per_molecule = file_val.pe_per_molecule.ok_or_else(|| {
        CliError::Config("`reference` requires `pe-per-molecule`".to_string())
    })?;
    Ok(Some(ReferenceConfig {
        pe_per_molecule,
        stdev: file_val.stdev.unwrap_or(0.0),
        z: file_val.z.unwrap_or(defaults.reference_z),
    }))
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid {} value for {}: {}",
            std::any::type_name::<T>(),
            key,
            value
        ))
    })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let key = key.trim();

        match key {
            "system.box-length" => {
                let system = config.system.get_or_insert_with(Default::default);
                system.box_length = Some(parse_value(key, value)?);
                system.box_lengths = None;
            }
            "system.molecules" => {
                config.system.get_or_insert_with(Default::default).molecules =
                    Some(parse_value(key, value)?);
            }
            "system.template" => {
                config.system.get_or_insert_with(Default::default).template =
                    Some(value.trim().to_string());
            }
            "system.placement" => {
                config.system.get_or_insert_with(Default::default).placement =
                    Some(value.trim().to_string());
            }
            "potential.r-cut" => {
                config.potential.get_or_insert_with(Default::default).r_cut =
                    Some(parse_value(key, value)?);
            }
            "potential.alpha-l" => {
                config.potential.get_or_insert_with(Default::default).alpha_l =
                    Some(parse_value(key, value)?);
            }
            "potential.k2max" => {
                config.potential.get_or_insert_with(Default::default).k2max =
                    Some(parse_value(key, value)?);
            }
            "potential.long-range-correction" => {
                config
                    .potential
                    .get_or_insert_with(Default::default)
                    .long_range_correction = Some(parse_value(key, value)?);
            }
            "potential.linear-shift" => {
                config.potential.get_or_insert_with(Default::default).linear_shift =
                    Some(parse_value(key, value)?);
            }
            "criteria.temperature" => {
                config.criteria.get_or_insert_with(Default::default).temperature =
                    Some(parse_value(key, value)?);
            }
            "criteria.activity" => {
                config.criteria.get_or_insert_with(Default::default).activity =
                    Some(parse_value(key, value)?);
            }
            "run.equilibration-trials" => {
                config.run.get_or_insert_with(Default::default).equilibration_trials =
                    Some(parse_value(key, value)?);
            }
            "run.production-trials" => {
                config.run.get_or_insert_with(Default::default).production_trials =
                    Some(parse_value(key, value)?);
            }
            "run.tune-frequency" => {
                config.run.get_or_insert_with(Default::default).tune_frequency =
                    Some(parse_value(key, value)?);
            }
            "run.check-energy-frequency" => {
                config
                    .run
                    .get_or_insert_with(Default::default)
                    .check_energy_frequency = Some(parse_value(key, value)?);
            }
            "run.check-energy-tolerance" => {
                config
                    .run
                    .get_or_insert_with(Default::default)
                    .check_energy_tolerance = Some(parse_value(key, value)?);
            }
            "run.seed" => {
                config.run.get_or_insert_with(Default::default).seed =
                    Some(parse_value(key, value)?);
            }
            "run.block-size" => {
                config.run.get_or_insert_with(Default::default).block_size =
                    Some(parse_value(key, value)?);
            }
            "output.log-frequency" => {
                config.output.get_or_insert_with(Default::default).log_frequency =
                    Some(parse_value(key, value)?);
            }
            "output.movie-frequency" => {
                config.output.get_or_insert_with(Default::default).movie_frequency =
                    Some(parse_value(key, value)?);
            }
            "output.restart-frequency" => {
                config
                    .output
                    .get_or_insert_with(Default::default)
                    .restart_frequency = Some(parse_value(key, value)?);
            }
            "reference.pe-per-molecule" => {
                config
                    .reference
                    .get_or_insert_with(Default::default)
                    .pe_per_molecule = Some(parse_value(key, value)?);
            }
            "reference.stdev" => {
                config.reference.get_or_insert_with(Default::default).stdev =
                    Some(parse_value(key, value)?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
