//! Declarative experiment script, as ingested from JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::types::ConditionTag;

/// Top-level script: the experiment's blocks plus root ordering constraints.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub blocks: Vec<BlockSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exchangeable: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub counterbalance: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlockSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_if: Option<RunIfSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criterion: Option<f64>,
    #[serde(default = "default_cutoff")]
    pub cutoff: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<BlockSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<PageSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<Vec<PageSpec>>>,
    #[serde(default)]
    pub latin_square: bool,
    #[serde(default)]
    pub pseudorandom: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exchangeable: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub counterbalance: Vec<String>,
}

fn default_cutoff() -> u32 {
    1
}

/// Run-if rule as written in the script.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RunIfSpec {
    Selected {
        #[serde(rename = "pageID")]
        page_id: String,
        #[serde(rename = "optionID")]
        option_id: String,
    },
    Matched {
        #[serde(rename = "pageID")]
        page_id: String,
        regex: String,
    },
    Permutation {
        permutation: Vec<u32>,
    },
}

/// A page as declared in the script.
///
/// Only `id` and `condition` matter to the engine; everything else is
/// presentation data handed through to the display collaborator.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PageSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionTag>,
    #[serde(flatten)]
    pub content: Map<String, Value>,
}

/// Borrowed view of a block's children.
#[derive(Debug, Clone, Copy)]
pub enum BlockContent<'a> {
    Blocks(&'a [BlockSpec]),
    Pages(&'a [PageSpec]),
    Groups(&'a [Vec<PageSpec>]),
}

impl BlockSpec {
    /// Return the block's single content kind, or `None` when zero or several are set.
    pub fn content(&self) -> Option<BlockContent<'_>> {
        match (&self.blocks, &self.pages, &self.groups) {
            (Some(blocks), None, None) => Some(BlockContent::Blocks(blocks)),
            (None, Some(pages), None) => Some(BlockContent::Pages(pages)),
            (None, None, Some(groups)) => Some(BlockContent::Groups(groups)),
            _ => None,
        }
    }

    /// Every page the block declares directly, groups flattened.
    pub fn declared_pages(&self) -> Vec<&PageSpec> {
        match self.content() {
            Some(BlockContent::Pages(pages)) => pages.iter().collect(),
            Some(BlockContent::Groups(groups)) => groups.iter().flatten().collect(),
            _ => Vec::new(),
        }
    }
}

impl PageSpec {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            condition: None,
            content: Map::new(),
        }
    }
}
