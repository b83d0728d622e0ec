mod cli;
mod report;
mod results;
mod run;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use engine::core::pseudorandom::DEFAULT_REPAIR_WINDOW;

use crate::run::SimulationConfig;

#[derive(Parser)]
#[command(
    name = "sim",
    version,
    about = "Simulated participants for checking ordering balance"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run simulated participants through a script and report slot balance.
    Run {
        script: PathBuf,
        #[arg(long)]
        participants: u32,
        #[arg(long, default_value_t = 1)]
        versions: u32,
        #[arg(long, default_value_t = 1)]
        permutations: u32,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 0.8)]
        correct_rate: f64,
        #[arg(long, default_value_t = DEFAULT_REPAIR_WINDOW)]
        window: usize,
        #[arg(long, default_value_t = 10_000)]
        max_pages: usize,
        /// Directory for the timestamped result file.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print a saved result.
    Report { file: PathBuf },
}

fn main() -> Result<()> {
    engine::logging::init_with_default("warn,sim=info");
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            script,
            participants,
            versions,
            permutations,
            seed,
            correct_rate,
            window,
            max_pages,
            out,
        } => {
            let config = SimulationConfig {
                participants,
                versions,
                permutations,
                seed,
                correct_rate,
                repair_window: window,
                max_pages: Some(max_pages),
            };
            cli::run_simulation(&script, config, out.as_deref())
        }
        Command::Report { file } => cli::report_file(&file),
    }
}
