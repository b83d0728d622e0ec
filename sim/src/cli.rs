//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use engine::io::script_store::load_script;

use crate::report::print_summary;
use crate::results::{SimulationResult, read_result, write_result};
use crate::run::{SimulationConfig, simulate};

/// Simulate the participant pool and optionally save the result.
pub fn run_simulation(
    script_path: &Path,
    config: SimulationConfig,
    out_dir: Option<&Path>,
) -> Result<()> {
    let script = load_script(script_path)?;
    let started_at = Utc::now();
    let summary = simulate(&script, &config).context("simulate")?;
    let finished_at = Utc::now();
    print_summary(&summary);

    if let Some(out_dir) = out_dir {
        let result = SimulationResult::new(script_path, config, started_at, finished_at, summary);
        let path = write_result(out_dir, started_at, &result)?;
        info!(path = %path.display(), "saved simulation result");
        println!("run: results={}", path.display());
    }
    Ok(())
}

/// Re-print a saved result.
pub fn report_file(path: &Path) -> Result<()> {
    let result = read_result(path)?;
    println!(
        "run: script={} start={} duration_secs={:.2}",
        result.script, result.start_time, result.duration_secs
    );
    print_summary(&result.summary);
    Ok(())
}
