//! Drives simulated participants through one script.

use anyhow::{Context, Result, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use engine::core::types::Assignment;
use engine::experiment::{BuildOptions, Experiment};
use engine::script::Script;
use engine::session::{SimulatedParticipant, run_session};
use engine::store::MemoryOutcomeStore;

use crate::report::SimulationSummary;

/// Participant pool and rotation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub participants: u32,
    /// Latin-square versions to rotate through.
    pub versions: u32,
    /// Counterbalancing permutations to rotate through.
    pub permutations: u32,
    /// Participant `i` builds with seed `seed + i`.
    pub seed: u64,
    pub correct_rate: f64,
    pub repair_window: usize,
    /// Per-participant page cap, so a never-met criterion cannot run away.
    pub max_pages: Option<usize>,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.participants == 0 {
            bail!("participants must be > 0");
        }
        if self.versions == 0 || self.permutations == 0 {
            bail!("versions and permutations must be > 0");
        }
        if !(0.0..=1.0).contains(&self.correct_rate) {
            bail!("correct rate must be between 0 and 1");
        }
        Ok(())
    }

    /// Assignment handed to participant `index`.
    pub fn assignment_for(&self, index: u32) -> Assignment {
        Assignment {
            version: index % self.versions,
            permutation: index % self.permutations,
        }
    }
}

/// Run every participant and tally the orders they saw.
#[instrument(skip_all, fields(participants = config.participants))]
pub fn simulate(script: &Script, config: &SimulationConfig) -> Result<SimulationSummary> {
    config.validate()?;
    let mut summary = SimulationSummary::default();
    for index in 0..config.participants {
        let seed = config.seed.wrapping_add(u64::from(index));
        let options = BuildOptions {
            assignment: config.assignment_for(index),
            repair_window: config.repair_window,
        };
        let mut experiment = Experiment::with_seed(script, &options, Some(seed))
            .with_context(|| format!("build experiment for participant {index}"))?;
        let mut store = MemoryOutcomeStore::new();
        let mut participant = SimulatedParticipant::new(
            config.correct_rate,
            StdRng::seed_from_u64(seed.rotate_left(32)),
        );
        let outcome = run_session(&mut experiment, &mut store, &mut participant, config.max_pages)
            .with_context(|| format!("run participant {index}"))?;
        debug!(index, pages = outcome.shown.len(), "participant finished");
        summary.record(&experiment, &outcome);
    }
    info!(
        participants = summary.participants,
        completed = summary.completed,
        "simulation complete"
    );
    Ok(summary)
}
