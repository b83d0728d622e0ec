//! Outcome store that persists the session record as JSON when finalized.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::path::UnitPath;
use crate::core::types::{Assignment, Response};
use crate::store::{MemoryOutcomeStore, OutcomeStore, ResponseRecord};

/// Contents of a session record file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub assignment: Assignment,
    pub records: Vec<ResponseRecord>,
}

/// In-memory store whose `finalize` writes a [`SessionRecord`] to `path`.
#[derive(Debug)]
pub struct JsonRecordStore {
    path: PathBuf,
    assignment: Assignment,
    inner: MemoryOutcomeStore,
}

impl JsonRecordStore {
    pub fn new(path: impl Into<PathBuf>, assignment: Assignment) -> Self {
        Self {
            path: path.into(),
            assignment,
            inner: MemoryOutcomeStore::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[ResponseRecord] {
        self.inner.records()
    }
}

impl OutcomeStore for JsonRecordStore {
    fn record_response(&mut self, path: &UnitPath, response: Response) {
        self.inner.record_response(path, response);
    }

    fn outcome_history(&self, path: &UnitPath) -> Vec<bool> {
        self.inner.outcome_history(path)
    }

    fn selection(&self, path: &UnitPath) -> Option<String> {
        self.inner.selection(path)
    }

    fn response_text(&self, path: &UnitPath) -> Option<String> {
        self.inner.response_text(path)
    }

    fn finalize(&mut self) -> Result<()> {
        self.inner.finalize()?;
        let record = SessionRecord {
            assignment: self.assignment,
            records: self.inner.records().to_vec(),
        };
        write_record(&self.path, &record)?;
        info!(
            path = %self.path.display(),
            responses = record.records.len(),
            "session record written"
        );
        Ok(())
    }
}

/// Read a session record written by [`JsonRecordStore`].
pub fn read_record(path: &Path) -> Result<SessionRecord> {
    let raw = fs::read_to_string(path).with_context(|| format!("read record {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse record {}", path.display()))
}

/// Atomically write a session record (temp file + rename).
fn write_record(path: &Path, record: &SessionRecord) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let mut buf = serde_json::to_string_pretty(record).context("serialize session record")?;
    buf.push('\n');
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, buf).with_context(|| format!("write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
