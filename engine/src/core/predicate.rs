//! Run-if rules gating whether a unit runs at all.

use std::collections::BTreeSet;

use regex::Regex;

use crate::core::path::UnitPath;
use crate::core::types::ScriptConfigurationError;
use crate::script::RunIfSpec;
use crate::store::OutcomeStore;

/// Condition evaluated each time a unit is asked to run.
#[derive(Debug, Clone, Default)]
pub enum ConditionPredicate {
    #[default]
    Always,
    /// The page at `target` was last answered with `option_id`.
    SelectedOption { target: UnitPath, option_id: String },
    /// The text last entered on the page at `target` matches `pattern`.
    MatchedResponse { target: UnitPath, pattern: Regex },
    /// The participant's permutation is one of `values`.
    PermutationEquals { values: BTreeSet<u32> },
}

impl ConditionPredicate {
    /// Build a predicate from its script form, resolving page ids to paths
    /// with `resolve`.
    pub fn from_spec<F>(
        spec: Option<&RunIfSpec>,
        resolve: F,
    ) -> Result<Self, ScriptConfigurationError>
    where
        F: Fn(&str) -> Result<UnitPath, ScriptConfigurationError>,
    {
        let Some(spec) = spec else {
            return Ok(Self::Always);
        };
        Ok(match spec {
            RunIfSpec::Selected { page_id, option_id } => Self::SelectedOption {
                target: resolve(page_id)?,
                option_id: option_id.clone(),
            },
            RunIfSpec::Matched { page_id, regex } => Self::MatchedResponse {
                target: resolve(page_id)?,
                pattern: Regex::new(regex).map_err(|err| {
                    ScriptConfigurationError::new(format!("invalid runIf regex '{regex}': {err}"))
                })?,
            },
            RunIfSpec::Permutation { permutation } => Self::PermutationEquals {
                values: permutation.iter().copied().collect(),
            },
        })
    }

    /// A missing selection or response makes the rule false, never an error.
    pub fn evaluate<S: OutcomeStore + ?Sized>(&self, store: &S, permutation: u32) -> bool {
        match self {
            Self::Always => true,
            Self::SelectedOption { target, option_id } => {
                store.selection(target).as_deref() == Some(option_id.as_str())
            }
            Self::MatchedResponse { target, pattern } => store
                .response_text(target)
                .is_some_and(|text| pattern.is_match(&text)),
            Self::PermutationEquals { values } => values.contains(&permutation),
        }
    }
}
