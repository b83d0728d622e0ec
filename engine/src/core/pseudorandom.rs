//! Pseudorandom ordering that keeps same-condition pages apart.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::core::types::ScriptConfigurationError;

/// Default width of the neighbourhood checked when repairing a collision.
pub const DEFAULT_REPAIR_WINDOW: usize = 3;

/// Order items so that no two adjacent items share a condition.
///
/// Returns indices into `conditions`. The items are shuffled, then the output
/// is built greedily by always taking the first remaining item whose condition
/// differs from the last one placed. When every remaining item matches, the
/// next item is swapped into the earliest placed position whose
/// neighbourhood is free of its condition, and the displaced item moves to the
/// end. The neighbourhood always spans both adjacent positions; a `window`
/// wider than 3 extends it further.
///
/// Fails when any item has no condition, or when no repair position exists
/// (conditions too unbalanced to avoid repeats).
pub fn pseudorandom_order<C: PartialEq, R: Rng + ?Sized>(
    conditions: &[Option<C>],
    window: usize,
    rng: &mut R,
) -> Result<Vec<usize>, ScriptConfigurationError> {
    let conds: Vec<&C> = conditions
        .iter()
        .map(Option::as_ref)
        .collect::<Option<_>>()
        .ok_or_else(|| {
            ScriptConfigurationError::new("can't pseudorandomize if not all pages have a condition")
        })?;

    let mut remaining: Vec<usize> = (0..conds.len()).collect();
    remaining.shuffle(rng);
    let mut placed: Vec<usize> = Vec::with_capacity(remaining.len());
    if remaining.is_empty() {
        return Ok(placed);
    }
    placed.push(remaining.remove(0));

    while !remaining.is_empty() {
        let last = conds[placed[placed.len() - 1]];
        match remaining.iter().position(|&i| conds[i] != last) {
            Some(addable) => placed.push(remaining.remove(addable)),
            None => {
                let next = remaining.remove(0);
                swap_into(next, &mut placed, &conds, window)?;
            }
        }
    }

    Ok(placed)
}

fn swap_into<C: PartialEq>(
    next: usize,
    placed: &mut Vec<usize>,
    conds: &[&C],
    window: usize,
) -> Result<(), ScriptConfigurationError> {
    let cond = conds[next];
    // Immediate neighbours are always checked; `window` only widens the scan.
    let before = (window.saturating_sub(1) / 2).max(1);
    let after = (window / 2).max(1);
    let target = (0..placed.len()).find(|&i| {
        let start = i.saturating_sub(before);
        let end = (i + after).min(placed.len() - 1);
        placed[start..=end].iter().all(|&j| conds[j] != cond)
    });

    match target {
        Some(i) => {
            let displaced = placed[i];
            placed[i] = next;
            placed.push(displaced);
            Ok(())
        }
        None => Err(ScriptConfigurationError::new(
            "pseudorandomization may not work if there are not an equal number of all conditions",
        )),
    }
}

/// True if no two neighbouring entries share a condition.
pub fn has_no_adjacent_repeats<C: PartialEq>(ordered: &[C]) -> bool {
    ordered.windows(2).all(|pair| pair[0] != pair[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn balanced(conditions: usize, per_condition: usize) -> Vec<Option<usize>> {
        (0..conditions)
            .flat_map(|c| std::iter::repeat_n(Some(c), per_condition))
            .collect()
    }

    fn arranged(conds: &[Option<usize>], order: &[usize]) -> Vec<usize> {
        order
            .iter()
            .map(|&i| conds[i].expect("condition"))
            .collect()
    }

    #[test]
    fn balanced_inputs_never_repeat_adjacent_conditions() {
        for (conditions, per_condition) in [(2, 1), (2, 5), (3, 2), (3, 4), (4, 3), (5, 5)] {
            let conds = balanced(conditions, per_condition);
            for seed in 0..200 {
                let mut rng = StdRng::seed_from_u64(seed);
                let order = pseudorandom_order(&conds, DEFAULT_REPAIR_WINDOW, &mut rng)
                    .expect("balanced input orders");
                let mut sorted = order.clone();
                sorted.sort_unstable();
                assert_eq!(sorted, (0..conds.len()).collect::<Vec<_>>());
                assert!(
                    has_no_adjacent_repeats(&arranged(&conds, &order)),
                    "{conditions}x{per_condition} seed {seed}"
                );
            }
        }
    }

    #[test]
    fn single_condition_is_rejected() {
        let conds = vec![Some("a"); 3];
        let mut rng = StdRng::seed_from_u64(1);
        let err = pseudorandom_order(&conds, DEFAULT_REPAIR_WINDOW, &mut rng)
            .expect_err("degenerate");
        assert!(err.cause.contains("equal number"));
    }

    #[test]
    fn missing_condition_is_rejected() {
        let conds = vec![Some("a"), None, Some("b")];
        let mut rng = StdRng::seed_from_u64(1);
        let err = pseudorandom_order(&conds, DEFAULT_REPAIR_WINDOW, &mut rng)
            .expect_err("missing");
        assert!(err.cause.contains("condition"));
    }

    #[test]
    fn trivial_inputs_pass_through() {
        let mut rng = StdRng::seed_from_u64(1);
        let empty: Vec<Option<u8>> = Vec::new();
        assert!(pseudorandom_order(&empty, 3, &mut rng).expect("empty").is_empty());
        assert_eq!(pseudorandom_order(&[Some(1)], 3, &mut rng).expect("one"), vec![0]);
    }

    #[test]
    fn repair_moves_collision_into_free_window() {
        let all = ['a', 'b', 'a', 'b', 'c', 'c'];
        let conds: Vec<&char> = all.iter().collect();
        let mut placed = vec![0, 1, 2, 3, 4];
        swap_into(5, &mut placed, &conds, 3).expect("repair");
        assert_eq!(placed, vec![5, 1, 2, 3, 4, 0]);
    }

    #[test]
    fn every_window_keeps_neighbours_apart() {
        for window in 1..=6 {
            for (conditions, per_condition) in [(2, 3), (3, 4), (4, 2), (5, 3)] {
                let conds = balanced(conditions, per_condition);
                for seed in 0..300 {
                    let mut rng = StdRng::seed_from_u64(seed);
                    match pseudorandom_order(&conds, window, &mut rng) {
                        Ok(order) => assert!(
                            has_no_adjacent_repeats(&arranged(&conds, &order)),
                            "window {window} {conditions}x{per_condition} seed {seed}"
                        ),
                        Err(err) => assert!(err.cause.contains("equal number")),
                    }
                }
            }
        }
    }

    #[test]
    fn narrow_window_still_checks_both_neighbours() {
        let all = ['c', 'a', 'c', 'b', 'c'];
        let conds: Vec<&char> = all.iter().collect();
        for window in 1..=3 {
            let mut placed = vec![0, 1, 2, 3];
            assert!(
                swap_into(4, &mut placed, &conds, window).is_err(),
                "window {window}"
            );
            assert_eq!(placed, vec![0, 1, 2, 3]);
        }
    }
}
