//! Choosing one page per condition group.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::core::types::ScriptConfigurationError;

/// Pick element `(group_index + version) mod n` from each group.
///
/// Every group must have the same non-zero size `n`; across versions
/// `0..n` each element of each group is chosen exactly once.
pub fn select_latin_square<T: Clone>(
    groups: &[Vec<T>],
    version: u32,
) -> Result<Vec<T>, ScriptConfigurationError> {
    let Some(first) = groups.first() else {
        return Ok(Vec::new());
    };
    let conditions = first.len();
    if conditions == 0 {
        return Err(ScriptConfigurationError::new(
            "can't do Latin square on empty groups",
        ));
    }
    if groups.iter().any(|group| group.len() != conditions) {
        return Err(ScriptConfigurationError::new(
            "can't do Latin square on groups of uneven sizes",
        ));
    }

    Ok(groups
        .iter()
        .enumerate()
        .map(|(i, group)| group[(i + version as usize) % conditions].clone())
        .collect())
}

/// Pick one element from each group independently and uniformly.
pub fn select_random<T: Clone, R: Rng + ?Sized>(
    groups: &[Vec<T>],
    rng: &mut R,
) -> Result<Vec<T>, ScriptConfigurationError> {
    groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            group
                .choose(rng)
                .cloned()
                .ok_or_else(|| ScriptConfigurationError::new(format!("group {i} is empty")))
        })
        .collect()
}
