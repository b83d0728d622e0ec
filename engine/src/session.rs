//! Session driver: advances an experiment with a participant standing in for
//! the display and evaluation collaborators.

use anyhow::Result;
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::Value;
use tracing::debug;

use crate::core::path::UnitPath;
use crate::core::types::Response;
use crate::experiment::{Experiment, Step};
use crate::store::OutcomeStore;
use crate::unit::Page;

/// Produces a response for each displayed page.
pub trait Participant {
    fn respond(&mut self, page: &Page) -> Response;
}

/// Reason why `run_session` stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStop {
    /// The experiment finished and the store was finalized.
    Finished,
    /// `max_pages` pages were shown before the experiment finished.
    PageLimit { max_pages: usize },
}

/// Summary of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Paths of displayed pages, in display order.
    pub shown: Vec<UnitPath>,
    pub stop: SessionStop,
}

impl SessionOutcome {
    /// Displayed page ids, in display order.
    pub fn page_ids(&self) -> Vec<&str> {
        self.shown.iter().filter_map(UnitPath::id).collect()
    }
}

/// Advance `experiment` until it finishes (or `max_pages` pages were shown),
/// recording every response in `store` before advancing again.
pub fn run_session<R, S, P>(
    experiment: &mut Experiment<R>,
    store: &mut S,
    participant: &mut P,
    max_pages: Option<usize>,
) -> Result<SessionOutcome>
where
    R: Rng,
    S: OutcomeStore + ?Sized,
    P: Participant + ?Sized,
{
    let mut shown = Vec::new();
    loop {
        if let Some(max_pages) = max_pages
            && shown.len() >= max_pages
        {
            return Ok(SessionOutcome {
                shown,
                stop: SessionStop::PageLimit { max_pages },
            });
        }

        let mut response = None;
        let step = experiment.advance(store, &mut |page: &Page| {
            response = Some(participant.respond(page));
        })?;
        match step {
            Step::Displayed(path) => {
                let response = response.unwrap_or_default();
                debug!(page = %path, correct = ?response.correct, "page answered");
                store.record_response(&path, response);
                shown.push(path);
            }
            Step::Finished => {
                return Ok(SessionOutcome {
                    shown,
                    stop: SessionStop::Finished,
                });
            }
        }
    }
}

/// Participant answering correctly with a fixed probability.
///
/// When a page lists `options` (objects with an `id`), one is selected at
/// random; a page with `freetext` set gets a canned text response. Rates
/// outside `0.0..=1.0` are clamped and a non-finite rate counts as `0.0`.
#[derive(Debug, Clone)]
pub struct SimulatedParticipant<R> {
    correct_rate: f64,
    rng: R,
}

impl<R: Rng> SimulatedParticipant<R> {
    pub fn new(correct_rate: f64, rng: R) -> Self {
        let correct_rate = if correct_rate.is_finite() {
            correct_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self { correct_rate, rng }
    }
}

impl<R: Rng> Participant for SimulatedParticipant<R> {
    fn respond(&mut self, page: &Page) -> Response {
        let options: Vec<&str> = page
            .content
            .get("options")
            .and_then(Value::as_array)
            .map(|options| {
                options
                    .iter()
                    .filter_map(|option| option.get("id").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();
        let freetext = page
            .content
            .get("freetext")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Response {
            selection: options.choose(&mut self.rng).map(|id| id.to_string()),
            text: freetext.then(|| "simulated response".to_string()),
            correct: Some(self.rng.gen_bool(self.correct_rate)),
        }
    }
}
