//! Experiment presentation-order engine.
//!
//! Validates experiment scripts, prints the run order a participant would
//! get for a given assignment, and runs simulated sessions.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;

use engine::core::types::ScriptConfigurationError;
use engine::exit_codes;
use engine::experiment::Experiment;
use engine::io::config::{EngineConfig, load_config, write_config};
use engine::io::record_store::JsonRecordStore;
use engine::io::script_store::load_script;
use engine::session::{SessionStop, SimulatedParticipant, run_session};
use engine::store::{MemoryOutcomeStore, OutcomeStore};

#[derive(Parser)]
#[command(
    name = "engine",
    version,
    about = "Presentation-order engine for block-structured experiments"
)]
struct Cli {
    /// Engine config file.
    #[arg(long, global = true, default_value = "engine.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Check a script against the schema and invariants, then build it once.
    Validate { script: PathBuf },
    /// Print the unit tree with the run orders chosen for one participant.
    Plan {
        script: PathBuf,
        #[command(flatten)]
        assignment: AssignmentArgs,
    },
    /// Run one simulated participant and print the pages shown.
    Simulate {
        script: PathBuf,
        #[command(flatten)]
        assignment: AssignmentArgs,
        /// Probability that a simulated response is graded correct.
        #[arg(long, default_value_t = 0.8)]
        correct_rate: f64,
        /// Write the session record to this file on completion.
        #[arg(long)]
        record: Option<PathBuf>,
        /// Stop after this many pages even if the experiment has not finished.
        #[arg(long)]
        max_pages: Option<usize>,
    },
}

/// Per-participant overrides for config values.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
struct AssignmentArgs {
    /// Latin-square version.
    #[arg(long)]
    version: Option<u32>,
    /// Counterbalancing permutation.
    #[arg(long)]
    permutation: Option<u32>,
    /// RNG seed.
    #[arg(long)]
    seed: Option<u64>,
}

impl AssignmentArgs {
    fn apply(&self, mut cfg: EngineConfig) -> EngineConfig {
        if let Some(version) = self.version {
            cfg.assignment.version = version;
        }
        if let Some(permutation) = self.permutation {
            cfg.assignment.permutation = permutation;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        cfg
    }
}

fn main() {
    engine::logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_code(&err));
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ScriptConfigurationError>().is_some() {
        exit_codes::CONFIG
    } else {
        exit_codes::INVALID
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Validate { script } => cmd_validate(&cli.config, &script),
        Command::Plan { script, assignment } => {
            let cfg = assignment.apply(load_config(&cli.config)?);
            cmd_plan(&cfg, &script)
        }
        Command::Simulate {
            script,
            assignment,
            correct_rate,
            record,
            max_pages,
        } => {
            let cfg = assignment.apply(load_config(&cli.config)?);
            cmd_simulate(&cfg, &script, correct_rate, record.as_deref(), max_pages)
        }
    }
}

fn cmd_init(config_path: &Path, force: bool) -> Result<()> {
    if !force && config_path.exists() {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }
    write_config(config_path, &EngineConfig::default())
        .with_context(|| format!("write {}", config_path.display()))?;
    println!("wrote {}", config_path.display());
    Ok(())
}

fn cmd_validate(config_path: &Path, script_path: &Path) -> Result<()> {
    let cfg = load_config(config_path)?;
    let script = load_script(script_path)?;
    Experiment::with_seed(&script, &cfg.build_options(), cfg.seed)
        .with_context(|| format!("build {}", script_path.display()))?;
    println!("ok");
    Ok(())
}

fn cmd_plan(cfg: &EngineConfig, script_path: &Path) -> Result<()> {
    let script = load_script(script_path)?;
    let experiment = Experiment::with_seed(&script, &cfg.build_options(), cfg.seed)
        .with_context(|| format!("build {}", script_path.display()))?;
    print!("{}", experiment.describe());
    Ok(())
}

fn cmd_simulate(
    cfg: &EngineConfig,
    script_path: &Path,
    correct_rate: f64,
    record: Option<&Path>,
    max_pages: Option<usize>,
) -> Result<()> {
    if !(0.0..=1.0).contains(&correct_rate) {
        bail!("--correct-rate must be between 0 and 1, got {correct_rate}");
    }
    let script = load_script(script_path)?;
    let options = cfg.build_options();
    let mut experiment = Experiment::with_seed(&script, &options, cfg.seed)
        .with_context(|| format!("build {}", script_path.display()))?;
    let participant_rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_entropy(),
    };
    let mut participant = SimulatedParticipant::new(correct_rate, participant_rng);

    let mut store: Box<dyn OutcomeStore> = match record {
        Some(path) => Box::new(JsonRecordStore::new(path, options.assignment)),
        None => Box::new(MemoryOutcomeStore::new()),
    };
    let outcome = run_session(&mut experiment, store.as_mut(), &mut participant, max_pages)?;
    for path in &outcome.shown {
        println!("{path}");
    }
    if let SessionStop::PageLimit { max_pages } = outcome.stop {
        eprintln!("stopped after {max_pages} pages before the experiment finished");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init() {
        let cli = Cli::parse_from(["engine", "init"]);
        assert!(matches!(cli.command, Command::Init { force: false }));
        assert_eq!(cli.config, PathBuf::from("engine.toml"));
    }

    #[test]
    fn parse_init_force_with_config() {
        let cli = Cli::parse_from(["engine", "init", "--force", "--config", "cfg/e.toml"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
        assert_eq!(cli.config, PathBuf::from("cfg/e.toml"));
    }

    #[test]
    fn parse_plan_assignment_flags() {
        let cli = Cli::parse_from([
            "engine",
            "plan",
            "script.json",
            "--version",
            "2",
            "--permutation",
            "1",
            "--seed",
            "7",
        ]);
        let Command::Plan { script, assignment } = cli.command else {
            panic!("expected plan");
        };
        assert_eq!(script, PathBuf::from("script.json"));
        assert_eq!(
            assignment,
            AssignmentArgs {
                version: Some(2),
                permutation: Some(1),
                seed: Some(7),
            }
        );
    }

    #[test]
    fn parse_simulate_defaults() {
        let cli = Cli::parse_from(["engine", "simulate", "script.json"]);
        let Command::Simulate {
            correct_rate,
            record,
            max_pages,
            ..
        } = cli.command
        else {
            panic!("expected simulate");
        };
        assert_eq!(correct_rate, 0.8);
        assert_eq!(record, None);
        assert_eq!(max_pages, None);
    }

    #[test]
    fn flags_override_config() {
        let args = AssignmentArgs {
            version: None,
            permutation: Some(3),
            seed: Some(9),
        };
        let mut cfg = EngineConfig::default();
        cfg.assignment.version = 4;
        let cfg = args.apply(cfg);
        assert_eq!(cfg.assignment.version, 4);
        assert_eq!(cfg.assignment.permutation, 3);
        assert_eq!(cfg.seed, Some(9));
    }

    #[test]
    fn configuration_errors_map_to_config_exit_code() {
        let err = anyhow::Error::new(ScriptConfigurationError::new("bad"))
            .context("build script.json");
        assert_eq!(exit_code(&err), exit_codes::CONFIG);
        assert_eq!(exit_code(&anyhow::anyhow!("io")), exit_codes::INVALID);
    }
}
