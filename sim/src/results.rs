//! Result persistence.
//!
//! Each simulation is written to its own timestamped JSON file so repeated
//! runs never overwrite each other.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::report::SimulationSummary;
use crate::run::SimulationConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub script: String,
    pub config: SimulationConfig,
    pub start_time: String,
    pub end_time: String,
    pub duration_secs: f64,
    pub summary: SimulationSummary,
}

impl SimulationResult {
    pub fn new(
        script: &Path,
        config: SimulationConfig,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        summary: SimulationSummary,
    ) -> Self {
        let duration = finished_at - started_at;
        Self {
            script: script.display().to_string(),
            config,
            start_time: started_at.to_rfc3339(),
            end_time: finished_at.to_rfc3339(),
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            summary,
        }
    }
}

/// File name for a result started at `started_at`.
pub fn result_file_name(started_at: DateTime<Utc>) -> String {
    format!("sim-{}.json", started_at.format("%Y%m%dT%H%M%S%.3fZ"))
}

/// Write `result` into `out_dir` and return the file path.
pub fn write_result(
    out_dir: &Path,
    started_at: DateTime<Utc>,
    result: &SimulationResult,
) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("create results dir {}", out_dir.display()))?;
    let path = out_dir.join(result_file_name(started_at));
    let contents = serde_json::to_string_pretty(result).context("serialize result")?;
    fs::write(&path, format!("{contents}\n"))
        .with_context(|| format!("write result {}", path.display()))?;
    debug!(path = %path.display(), "result written");
    Ok(path)
}

pub fn read_result(path: &Path) -> Result<SimulationResult> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse result {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn config() -> SimulationConfig {
        SimulationConfig {
            participants: 2,
            versions: 1,
            permutations: 2,
            seed: 0,
            correct_rate: 0.5,
            repair_window: 3,
            max_pages: None,
        }
    }

    #[test]
    fn file_name_is_timestamped() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 1).unwrap();
        assert_eq!(result_file_name(at), "sim-20240309T140501.000Z.json");
    }

    #[test]
    fn written_result_reads_back() {
        let temp = tempdir().expect("tempdir");
        let started = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let finished = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 2).unwrap();
        let summary = SimulationSummary {
            participants: 2,
            ..SimulationSummary::default()
        };
        let result = SimulationResult::new(
            Path::new("script.json"),
            config(),
            started,
            finished,
            summary,
        );
        assert_eq!(result.duration_secs, 2.0);

        let path = write_result(&temp.path().join("out"), started, &result).expect("write");
        assert!(path.ends_with("sim-20240101T000000.000Z.json"));
        assert_eq!(read_result(&path).expect("read"), result);
    }
}
