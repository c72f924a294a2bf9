use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "mcsim CLI - Metropolis Monte Carlo simulation of rigid point-charge molecules such as SPC/E water, with Lennard-Jones and Ewald-summed electrostatics.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel energy evaluation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fill the cell, equilibrate and sample a canonical-ensemble simulation.
    Run(RunArgs),
    /// Continue a simulation from a restart file.
    Resume(ResumeArgs),
    /// Evaluate the potential energy of a configuration once, with its components.
    Energy(EnergyArgs),
}

/// Command-line replacements for values of the configuration file.
#[derive(Args, Debug, Default, Clone)]
pub struct RunOverrides {
    /// Override `run.seed` (the wall clock is used when neither is given).
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Override `run.equilibration-trials`.
    #[arg(long, value_name = "INT")]
    pub equilibration: Option<u64>,

    /// Override `run.production-trials`.
    #[arg(long, value_name = "INT")]
    pub production: Option<u64>,

    /// Override `system.molecules`.
    #[arg(long, value_name = "INT")]
    pub molecules: Option<usize>,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the simulation configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    #[command(flatten)]
    pub overrides: RunOverrides,

    /// Skip the comparison with the `[reference]` section of the config file.
    #[arg(long)]
    pub no_reference: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S run.production-trials=5000
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `resume` subcommand.
#[derive(Args, Debug)]
pub struct ResumeArgs {
    /// Path to a JSON restart file written by a previous run.
    #[arg(required = true, value_name = "PATH")]
    pub restart: PathBuf,

    /// Number of additional trials to attempt.
    #[arg(short, long, required = true, value_name = "INT")]
    pub trials: u64,
}

/// Arguments for the `energy` subcommand.
#[derive(Args, Debug)]
pub struct EnergyArgs {
    /// Path to the simulation configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Read the configuration from the first frame of an XYZ file instead of a lattice.
    #[arg(long, value_name = "PATH")]
    pub xyz: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn help_names_project_authors() {
        assert_eq!(Cli::command().get_author(), Some("mcsim developers"));
    }

    #[test]
    fn parses_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "mcsim",
            "-vv",
            "run",
            "-c",
            "spce.toml",
            "--seed",
            "11",
            "--production",
            "500",
            "-S",
            "criteria.temperature=300",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.config, PathBuf::from("spce.toml"));
        assert_eq!(args.overrides.seed, Some(11));
        assert_eq!(args.overrides.production, Some(500));
        assert_eq!(args.overrides.equilibration, None);
        assert_eq!(args.set_values, vec!["criteria.temperature=300".to_string()]);
    }

    #[test]
    fn resume_requires_trial_count() {
        assert!(Cli::try_parse_from(["mcsim", "resume", "restart.json"]).is_err());
        let cli = Cli::try_parse_from(["mcsim", "resume", "restart.json", "-t", "100"]).unwrap();
        assert!(matches!(cli.command, Commands::Resume(ResumeArgs { trials: 100, .. })));
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["mcsim", "-q", "-v", "energy", "-c", "a.toml"]).is_err());
    }
}
