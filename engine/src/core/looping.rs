//! Adaptive looping: decide whether a unit repeats its children.

/// Criterion and cutoff governing how often a unit may repeat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopPolicy {
    /// Below 1: minimum proportion correct over the whole history.
    /// 1 or more: minimum trailing run of correct outcomes.
    /// `None` or zero never loops.
    pub criterion: Option<f64>,
    /// Hard ceiling on completed iterations; a cutoff of 1 allows exactly one pass.
    pub cutoff: u32,
}

impl Default for LoopPolicy {
    fn default() -> Self {
        Self {
            criterion: None,
            cutoff: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopDecision {
    Repeat,
    Stop,
}

impl LoopPolicy {
    /// Decide whether a unit on its `iteration`th pass (1-indexed) must repeat,
    /// given its graded history, oldest first.
    pub fn decide(&self, iteration: u32, history: &[bool]) -> LoopDecision {
        let criterion = match self.criterion {
            Some(criterion) if criterion > 0.0 => criterion,
            _ => return LoopDecision::Stop,
        };
        if iteration >= self.cutoff {
            return LoopDecision::Stop;
        }

        let metric = if criterion < 1.0 {
            match proportion_correct(history) {
                Some(proportion) => proportion,
                // Nothing graded yet: the proportion is undefined, so do not loop.
                None => return LoopDecision::Stop,
            }
        } else {
            trailing_streak(history) as f64
        };

        if metric < criterion {
            LoopDecision::Repeat
        } else {
            LoopDecision::Stop
        }
    }
}

/// Fraction of `true` entries, or `None` for an empty history.
pub fn proportion_correct(history: &[bool]) -> Option<f64> {
    if history.is_empty() {
        return None;
    }
    let correct = history.iter().filter(|&&outcome| outcome).count();
    Some(correct as f64 / history.len() as f64)
}

/// Number of `true` entries after the most recent `false`.
pub fn trailing_streak(history: &[bool]) -> usize {
    match history.iter().rposition(|&outcome| !outcome) {
        Some(last_incorrect) => history.len() - (last_incorrect + 1),
        None => history.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(criterion: f64, cutoff: u32) -> LoopPolicy {
        LoopPolicy {
            criterion: Some(criterion),
            cutoff,
        }
    }

    #[test]
    fn no_criterion_never_loops() {
        let policy = LoopPolicy {
            criterion: None,
            cutoff: 10,
        };
        assert_eq!(policy.decide(1, &[false, false]), LoopDecision::Stop);
        assert_eq!(
            LoopPolicy {
                criterion: Some(0.0),
                cutoff: 10
            }
            .decide(1, &[false]),
            LoopDecision::Stop
        );
    }

    #[test]
    fn fractional_criterion_uses_whole_history() {
        let history = [true, false, true, true];
        assert_eq!(policy(0.6, 5).decide(1, &history), LoopDecision::Stop);
        assert_eq!(policy(0.8, 5).decide(1, &history), LoopDecision::Repeat);
    }

    #[test]
    fn fractional_criterion_with_empty_history_stops() {
        assert_eq!(policy(0.5, 5).decide(1, &[]), LoopDecision::Stop);
    }

    #[test]
    fn streak_criterion_counts_from_last_incorrect() {
        let history = [true, false, true, true, true];
        assert_eq!(trailing_streak(&history), 3);
        assert_eq!(policy(3.0, 5).decide(1, &history), LoopDecision::Stop);
        assert_eq!(policy(4.0, 5).decide(1, &history), LoopDecision::Repeat);
    }

    #[test]
    fn streak_without_incorrect_counts_everything() {
        assert_eq!(trailing_streak(&[true, true]), 2);
        assert_eq!(trailing_streak(&[]), 0);
        assert_eq!(trailing_streak(&[true, false]), 0);
        assert_eq!(policy(1.0, 5).decide(1, &[]), LoopDecision::Repeat);
    }

    #[test]
    fn cutoff_stops_regardless_of_performance() {
        let history = [false, false, false];
        assert_eq!(policy(0.9, 3).decide(2, &history), LoopDecision::Repeat);
        assert_eq!(policy(0.9, 3).decide(3, &history), LoopDecision::Stop);
        assert_eq!(policy(2.0, 1).decide(1, &history), LoopDecision::Stop);
    }
}
