//! Shared deterministic types for the engine core.
//!
//! These types define stable contracts between core components. They should not
//! depend on external state or I/O.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal problem with an experiment script, detected before any page is shown.
///
/// There is no recovery: the script must be corrected before the experiment
/// can run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("script configuration error: {cause}")]
pub struct ScriptConfigurationError {
    pub cause: String,
}

impl ScriptConfigurationError {
    pub fn new(cause: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
        }
    }
}

/// Per-participant assignment selecting Latin-square and counterbalancing variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Assignment {
    /// Latin-square version: rotates which page is chosen from each group.
    pub version: u32,
    /// Counterbalancing permutation: rotates counterbalanced siblings and
    /// gates `PermutationEquals` run-if rules.
    pub permutation: u32,
}

/// Experimental condition a page belongs to.
///
/// Scripts may label conditions with strings or integers; the two never
/// compare equal to each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionTag {
    Number(i64),
    Name(String),
}

impl fmt::Display for ConditionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionTag::Number(n) => write!(f, "{n}"),
            ConditionTag::Name(name) => f.write_str(name),
        }
    }
}

/// A participant's response to one page, as summarized by the evaluation
/// collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Identifier of the chosen option, if the page offered options.
    pub selection: Option<String>,
    /// Free-text response, if the page accepted text.
    pub text: Option<String>,
    /// Whether the response was judged correct; `None` for ungraded pages.
    pub correct: Option<bool>,
}

impl Response {
    pub fn graded(correct: bool) -> Self {
        Self {
            correct: Some(correct),
            ..Self::default()
        }
    }
}
