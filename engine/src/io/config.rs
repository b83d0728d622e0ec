//! Engine configuration stored in `engine.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::pseudorandom::DEFAULT_REPAIR_WINDOW;
use crate::core::types::Assignment;
use crate::experiment::BuildOptions;

/// Engine configuration (TOML).
///
/// Missing fields default to a single-version, single-permutation run with an
/// entropy-seeded RNG.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Latin-square version and counterbalancing permutation for this participant.
    pub assignment: Assignment,

    /// RNG seed for shuffles; unset draws one from the OS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    pub pseudorandom: PseudorandomConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PseudorandomConfig {
    /// Neighbourhood width scanned when repairing a same-condition collision.
    pub window: usize,
}

impl Default for PseudorandomConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_REPAIR_WINDOW,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.pseudorandom.window == 0 {
            return Err(anyhow!("pseudorandom.window must be > 0"));
        }
        Ok(())
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            assignment: self.assignment,
            repair_window: self.pseudorandom.window,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `EngineConfig::default()`.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        let cfg = EngineConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: EngineConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &EngineConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
