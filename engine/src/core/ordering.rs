//! Sibling ordering under free-exchange and counterbalancing constraints.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::core::types::ScriptConfigurationError;

/// Constraints on the relative order of sibling units.
#[derive(Debug, Clone, Copy)]
pub struct SiblingScheme<'a> {
    /// Siblings whose positions are shuffled among themselves.
    pub free_exchange: &'a [String],
    /// Siblings rotated among their own positions by `permutation`.
    pub counterbalance: &'a [String],
    pub permutation: u32,
}

/// Return the run order of `ids` as indices into `ids`.
///
/// Siblings named in neither set keep their declared position. Free-exchange
/// siblings are uniformly permuted over the positions they occupy. The k-th
/// counterbalanced sibling (in declared order) moves to the
/// `(k + permutation) mod n`-th counterbalanced position, so cycling the
/// permutation through `0..n` puts every counterbalanced sibling in every one
/// of those positions exactly once.
pub fn order_siblings<R: Rng + ?Sized>(
    ids: &[&str],
    scheme: &SiblingScheme<'_>,
    rng: &mut R,
) -> Result<Vec<usize>, ScriptConfigurationError> {
    let free: HashSet<&str> = scheme.free_exchange.iter().map(String::as_str).collect();
    let balanced: HashSet<&str> = scheme.counterbalance.iter().map(String::as_str).collect();
    if let Some(both) = ids
        .iter()
        .find(|id| free.contains(*id) && balanced.contains(*id))
    {
        return Err(ScriptConfigurationError::new(format!(
            "'{both}' cannot be both exchangeable and counterbalanced"
        )));
    }

    let free_slots: Vec<usize> = (0..ids.len()).filter(|&i| free.contains(ids[i])).collect();
    let balanced_slots: Vec<usize> = (0..ids.len())
        .filter(|&i| balanced.contains(ids[i]))
        .collect();

    let mut order: Vec<usize> = (0..ids.len()).collect();

    let mut shuffled = free_slots.clone();
    shuffled.shuffle(rng);
    for (&slot, &unit) in free_slots.iter().zip(&shuffled) {
        order[slot] = unit;
    }

    let n = balanced_slots.len();
    if n > 0 {
        let shift = scheme.permutation as usize % n;
        for (k, &unit) in balanced_slots.iter().enumerate() {
            order[balanced_slots[(k + shift) % n]] = unit;
        }
    }

    Ok(order)
}
