//! Test-only helpers for building scripts and standing in for collaborators.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::types::{ConditionTag, Response};
use crate::display::Presenter;
use crate::script::{BlockSpec, PageSpec, Script};
use crate::session::Participant;
use crate::unit::Page;

/// Page with no condition and no presentation data.
pub fn page(id: &str) -> PageSpec {
    PageSpec::new(id)
}

/// Page tagged with a string condition.
pub fn tagged_page(id: &str, condition: &str) -> PageSpec {
    PageSpec {
        condition: Some(ConditionTag::Name(condition.to_string())),
        ..PageSpec::new(id)
    }
}

fn block(id: &str) -> BlockSpec {
    BlockSpec {
        id: id.to_string(),
        run_if: None,
        criterion: None,
        cutoff: 1,
        blocks: None,
        pages: None,
        groups: None,
        latin_square: false,
        pseudorandom: false,
        exchangeable: Vec::new(),
        counterbalance: Vec::new(),
    }
}

/// Block whose children are blocks.
pub fn branch(id: &str, children: Vec<BlockSpec>) -> BlockSpec {
    BlockSpec {
        blocks: Some(children),
        ..block(id)
    }
}

/// Block holding a flat list of pages.
pub fn page_block(id: &str, pages: Vec<PageSpec>) -> BlockSpec {
    BlockSpec {
        pages: Some(pages),
        ..block(id)
    }
}

/// Block holding condition groups.
pub fn grouped_block(id: &str, groups: Vec<Vec<PageSpec>>) -> BlockSpec {
    BlockSpec {
        groups: Some(groups),
        ..block(id)
    }
}

/// Presenter that remembers every page it was handed.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub pages: Vec<Page>,
}

impl RecordingPresenter {
    pub fn ids(&self) -> Vec<String> {
        self.pages.iter().map(|page| page.id.clone()).collect()
    }
}

impl Presenter for RecordingPresenter {
    fn display(&mut self, page: &Page) {
        self.pages.push(page.clone());
    }
}

/// Participant that answers correctly exactly on the listed page ids.
#[derive(Debug, Default)]
pub struct ScriptedParticipant {
    correct: HashSet<String>,
    pub seen: Vec<String>,
}

impl ScriptedParticipant {
    pub fn correct_on(ids: &[&str]) -> Self {
        Self {
            correct: ids.iter().map(|id| id.to_string()).collect(),
            seen: Vec::new(),
        }
    }
}

impl Participant for ScriptedParticipant {
    fn respond(&mut self, page: &Page) -> Response {
        self.seen.push(page.id.clone());
        Response::graded(self.correct.contains(&page.id))
    }
}

/// Temporary directory for tests that read or write script/config/record files.
pub struct TestDir {
    temp: TempDir,
}

impl TestDir {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp: tempfile::tempdir().context("create tempdir")?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Serialize `script` to `<dir>/<name>` and return its path.
    pub fn write_script(&self, name: &str, script: &Script) -> Result<PathBuf> {
        let raw = serde_json::to_string_pretty(script).context("serialize script")?;
        self.write_file(name, &raw)
    }

    pub fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.temp.path().join(name);
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}
