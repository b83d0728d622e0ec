//! Outcome store contract and an in-memory implementation.
//!
//! The store is written only by the evaluation collaborator (after a page
//! completes) and read by looping decisions and run-if rules.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::path::UnitPath;
use crate::core::types::Response;

/// Record of past outcomes, keyed by unit path.
pub trait OutcomeStore {
    /// Append a response recorded for the page at `path`.
    fn record_response(&mut self, path: &UnitPath, response: Response);

    /// Append a bare pass/fail outcome for `path`.
    fn record_outcome(&mut self, path: &UnitPath, correct: bool) {
        self.record_response(path, Response::graded(correct));
    }

    /// Graded outcomes recorded at `path` or beneath it, oldest first.
    fn outcome_history(&self, path: &UnitPath) -> Vec<bool>;

    /// Option chosen the most recent time the page at `path` was answered.
    fn selection(&self, path: &UnitPath) -> Option<String>;

    /// Free text entered the most recent time the page at `path` was answered.
    fn response_text(&self, path: &UnitPath) -> Option<String>;

    /// Hand the collected data off for submission. Called once, when the
    /// experiment root runs out of children.
    fn finalize(&mut self) -> Result<()>;
}

/// One recorded response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub path: UnitPath,
    #[serde(flatten)]
    pub response: Response,
}

/// In-memory store, appended in arrival order.
#[derive(Debug, Clone, Default)]
pub struct MemoryOutcomeStore {
    records: Vec<ResponseRecord>,
    finalized: bool,
}

impl MemoryOutcomeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ResponseRecord] {
        &self.records
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn latest(&self, path: &UnitPath) -> Option<&Response> {
        self.records
            .iter()
            .rev()
            .find(|record| &record.path == path)
            .map(|record| &record.response)
    }
}

impl OutcomeStore for MemoryOutcomeStore {
    fn record_response(&mut self, path: &UnitPath, response: Response) {
        debug!(page = %path, correct = ?response.correct, "recording response");
        self.records.push(ResponseRecord {
            path: path.clone(),
            response,
        });
    }

    fn outcome_history(&self, path: &UnitPath) -> Vec<bool> {
        self.records
            .iter()
            .filter(|record| record.path.starts_with(path))
            .filter_map(|record| record.response.correct)
            .collect()
    }

    fn selection(&self, path: &UnitPath) -> Option<String> {
        self.latest(path)?.selection.clone()
    }

    fn response_text(&self, path: &UnitPath) -> Option<String> {
        self.latest(path)?.text.clone()
    }

    fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            bail!("outcome store already finalized");
        }
        self.finalized = true;
        Ok(())
    }
}
