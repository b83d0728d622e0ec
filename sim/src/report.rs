//! Ordering-balance tallies across simulated participants.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use engine::experiment::Experiment;
use engine::session::{SessionOutcome, SessionStop};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub participants: usize,
    /// Participants whose experiment finished (not cut off by the page cap).
    pub completed: usize,
    pub pages_shown: usize,
    /// Top-level slot index -> unit id -> participants who had it there.
    pub slots: BTreeMap<usize, BTreeMap<String, usize>>,
    /// Block path -> page id -> participants who saw it first in that block.
    pub first_pages: BTreeMap<String, BTreeMap<String, usize>>,
}

impl SimulationSummary {
    pub fn record<R: Rng>(&mut self, experiment: &Experiment<R>, outcome: &SessionOutcome) {
        self.participants += 1;
        if outcome.stop == SessionStop::Finished {
            self.completed += 1;
        }
        self.pages_shown += outcome.shown.len();

        for (slot, unit) in experiment.top_level().enumerate() {
            *self
                .slots
                .entry(slot)
                .or_default()
                .entry(unit.id.clone())
                .or_default() += 1;
        }

        let mut seen_blocks = BTreeMap::new();
        for path in &outcome.shown {
            let (Some(block), Some(page)) = (path.parent(), path.id()) else {
                continue;
            };
            seen_blocks
                .entry(block.to_string())
                .or_insert_with(|| page.to_string());
        }
        for (block, page) in seen_blocks {
            *self
                .first_pages
                .entry(block)
                .or_default()
                .entry(page)
                .or_default() += 1;
        }
    }

    pub fn mean_pages(&self) -> Option<f64> {
        (self.participants > 0).then(|| self.pages_shown as f64 / self.participants as f64)
    }
}

/// Print a summary in the `report:` line format.
pub fn print_summary(summary: &SimulationSummary) {
    println!(
        "report: participants={} completed={}",
        summary.participants, summary.completed
    );
    if let Some(mean) = summary.mean_pages() {
        println!("report: mean_pages={:.2}", mean);
    }
    for (slot, occupants) in &summary.slots {
        println!("report: slot {} {}", slot, format_counts(occupants));
    }
    for (block, pages) in &summary.first_pages {
        println!("report: first {} {}", block, format_counts(pages));
    }
}

fn format_counts(counts: &BTreeMap<String, usize>) -> String {
    counts
        .iter()
        .map(|(id, count)| format!("{id}={count}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::core::path::UnitPath;
    use engine::experiment::BuildOptions;
    use engine::script::Script;

    fn script() -> Script {
        serde_json::from_value(serde_json::json!({
            "blocks": [
                {"id": "a", "pages": [{"id": "a1"}]},
                {"id": "b", "blocks": [{"id": "inner", "pages": [{"id": "i1"}, {"id": "i2"}]}]}
            ]
        }))
        .expect("script")
    }

    #[test]
    fn records_slots_and_first_pages() {
        let experiment =
            Experiment::with_seed(&script(), &BuildOptions::default(), Some(1)).expect("build");
        let outcome = SessionOutcome {
            shown: vec![
                UnitPath::parse("a/a1"),
                UnitPath::parse("b/inner/i2"),
                UnitPath::parse("b/inner/i1"),
            ],
            stop: SessionStop::Finished,
        };
        let mut summary = SimulationSummary::default();
        summary.record(&experiment, &outcome);
        summary.record(
            &experiment,
            &SessionOutcome {
                shown: vec![UnitPath::parse("a/a1")],
                stop: SessionStop::PageLimit { max_pages: 1 },
            },
        );

        assert_eq!(summary.participants, 2);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.mean_pages(), Some(2.0));
        assert_eq!(summary.slots[&0].get("a"), Some(&2));
        assert_eq!(summary.slots[&1].get("b"), Some(&2));
        assert_eq!(summary.first_pages["b/inner"].get("i2"), Some(&1));
        assert_eq!(summary.first_pages["a"].get("a1"), Some(&2));
    }

    #[test]
    fn empty_summary_has_no_mean() {
        assert_eq!(SimulationSummary::default().mean_pages(), None);
        let counts = BTreeMap::from([("x".to_string(), 2), ("y".to_string(), 1)]);
        assert_eq!(format_counts(&counts), "x=2 y=1");
    }
}
