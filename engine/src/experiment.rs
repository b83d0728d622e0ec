//! Experiment root: builds the unit tree and drives traversal.
//!
//! Control flows down on "run" and back up through parent links when a unit
//! is exhausted or skipped. Both directions are handled by one iterative
//! loop in [`Experiment::advance`], so stack depth does not grow with script
//! nesting.

use std::fmt::Write as _;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::core::invariants::validate_invariants;
use crate::core::looping::{LoopDecision, LoopPolicy};
use crate::core::ordering::{SiblingScheme, order_siblings};
use crate::core::path::{UnitPath, page_paths};
use crate::core::predicate::ConditionPredicate;
use crate::core::pseudorandom::DEFAULT_REPAIR_WINDOW;
use crate::core::selection::{select_latin_square, select_random};
use crate::core::types::{Assignment, ScriptConfigurationError};
use crate::display::Presenter;
use crate::script::{BlockContent, BlockSpec, PageSpec, Script};
use crate::store::OutcomeStore;
use crate::unit::{Children, Page, Unit, UnitId, order_pages};

/// Per-run construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    pub assignment: Assignment,
    /// Neighbourhood width for pseudorandom collision repair.
    pub repair_window: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            assignment: Assignment::default(),
            repair_window: DEFAULT_REPAIR_WINDOW,
        }
    }
}

/// Result of one call to [`Experiment::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// This page was handed to the presenter and is now current.
    Displayed(UnitPath),
    /// The root ran out of units and the outcome store was finalized.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Root,
    Unit(UnitId),
}

enum UnitAction {
    Descend(UnitId),
    Show(usize),
    Ascend,
}

/// A fully built experiment for one participant.
#[derive(Debug)]
pub struct Experiment<R = StdRng> {
    units: Vec<Unit>,
    top: Vec<UnitId>,
    cursor: usize,
    position: Position,
    assignment: Assignment,
    repair_window: usize,
    rng: R,
    finished: bool,
}

impl Experiment<StdRng> {
    /// Build with a seeded RNG, or one seeded from entropy when `seed` is `None`.
    pub fn with_seed(
        script: &Script,
        options: &BuildOptions,
        seed: Option<u64>,
    ) -> Result<Self, ScriptConfigurationError> {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::build(script, options, rng)
    }
}

impl<R: Rng> Experiment<R> {
    /// Validate `script` and build the whole unit tree, ordering every level.
    ///
    /// All configuration problems surface here, before any page is shown.
    pub fn build(
        script: &Script,
        options: &BuildOptions,
        rng: R,
    ) -> Result<Self, ScriptConfigurationError> {
        if options.repair_window == 0 {
            return Err(ScriptConfigurationError::new(
                "pseudorandom repair window must be > 0",
            ));
        }
        let errors = validate_invariants(script);
        if !errors.is_empty() {
            return Err(ScriptConfigurationError::new(errors.join("; ")));
        }

        let mut experiment = Self {
            units: Vec::new(),
            top: Vec::new(),
            cursor: 0,
            position: Position::Root,
            assignment: options.assignment,
            repair_window: options.repair_window,
            rng,
            finished: false,
        };

        let mut top = Vec::with_capacity(script.blocks.len());
        for block in &script.blocks {
            top.push(experiment.build_block(script, block, None, &UnitPath::root())?);
        }
        let order = experiment.order_units(&top, &script.exchangeable, &script.counterbalance)?;
        experiment.top = order.into_iter().map(|i| top[i]).collect();
        debug!(units = experiment.units.len(), "experiment built");
        Ok(experiment)
    }

    fn build_block(
        &mut self,
        script: &Script,
        block: &BlockSpec,
        parent: Option<UnitId>,
        parent_path: &UnitPath,
    ) -> Result<UnitId, ScriptConfigurationError> {
        let path = parent_path.child(&block.id);
        let predicate = ConditionPredicate::from_spec(block.run_if.as_ref(), |page_id| {
            resolve_page(script, page_id)
        })?;
        let policy = LoopPolicy {
            criterion: block.criterion,
            cutoff: block.cutoff,
        };
        let content = block.content().ok_or_else(|| {
            ScriptConfigurationError::new(format!(
                "{path}: block must have exactly one of blocks, pages, groups"
            ))
        })?;

        match content {
            BlockContent::Blocks(children) => {
                let id = UnitId(self.units.len());
                self.units.push(Unit::new(
                    &block.id,
                    path.clone(),
                    parent,
                    predicate,
                    policy,
                    Children::Units(Vec::new()),
                ));
                let mut child_ids = Vec::with_capacity(children.len());
                for child in children {
                    child_ids.push(self.build_block(script, child, Some(id), &path)?);
                }
                let order =
                    self.order_units(&child_ids, &block.exchangeable, &block.counterbalance)?;
                let unit = &mut self.units[id.0];
                unit.children = Children::Units(child_ids);
                unit.set_order(order);
                Ok(id)
            }
            BlockContent::Pages(specs) => {
                self.push_leaf(block, path, parent, predicate, policy, specs.iter().collect())
            }
            BlockContent::Groups(groups) => {
                let chosen = if block.latin_square {
                    select_latin_square(groups, self.assignment.version)
                } else {
                    select_random(groups, &mut self.rng)
                }
                .map_err(|err| ScriptConfigurationError::new(format!("{path}: {}", err.cause)))?;
                self.push_leaf(block, path, parent, predicate, policy, chosen.iter().collect())
            }
        }
    }

    fn push_leaf(
        &mut self,
        block: &BlockSpec,
        path: UnitPath,
        parent: Option<UnitId>,
        predicate: ConditionPredicate,
        policy: LoopPolicy,
        specs: Vec<&PageSpec>,
    ) -> Result<UnitId, ScriptConfigurationError> {
        let pages: Vec<Page> = specs
            .into_iter()
            .map(|spec| Page::from_spec(spec, &path))
            .collect();
        let order = order_pages(&pages, block.pseudorandom, self.repair_window, &mut self.rng)
            .map_err(|err| ScriptConfigurationError::new(format!("{path}: {}", err.cause)))?;
        let mut unit = Unit::new(
            &block.id,
            path,
            parent,
            predicate,
            policy,
            Children::Pages {
                pages,
                pseudorandom: block.pseudorandom,
            },
        );
        unit.set_order(order);
        let id = UnitId(self.units.len());
        self.units.push(unit);
        Ok(id)
    }

    fn order_units(
        &mut self,
        ids: &[UnitId],
        exchangeable: &[String],
        counterbalance: &[String],
    ) -> Result<Vec<usize>, ScriptConfigurationError> {
        let names: Vec<&str> = ids.iter().map(|id| self.units[id.0].id.as_str()).collect();
        order_siblings(
            &names,
            &SiblingScheme {
                free_exchange: exchangeable,
                counterbalance,
                permutation: self.assignment.permutation,
            },
            &mut self.rng,
        )
    }

    /// Run until a page is displayed or the experiment finishes.
    ///
    /// The first call starts the experiment. Each later call resumes at the
    /// unit owning the last displayed page; record that page's outcome in
    /// `store` before calling again. Only errors from the store's
    /// `finalize` are returned.
    pub fn advance<S, P>(&mut self, store: &mut S, presenter: &mut P) -> Result<Step>
    where
        S: OutcomeStore + ?Sized,
        P: Presenter + ?Sized,
    {
        if self.finished {
            return Ok(Step::Finished);
        }
        loop {
            match self.position {
                Position::Root => match self.top.get(self.cursor).copied() {
                    Some(next) => {
                        self.cursor += 1;
                        self.position = Position::Unit(next);
                    }
                    None => {
                        info!("experiment complete, finalizing records");
                        self.finished = true;
                        store.finalize()?;
                        return Ok(Step::Finished);
                    }
                },
                Position::Unit(id) => match self.step_unit(id, &*store) {
                    UnitAction::Descend(child) => self.position = Position::Unit(child),
                    UnitAction::Show(index) => {
                        let Children::Pages { pages, .. } = &self.units[id.0].children else {
                            unreachable!("only leaf-bearing units show pages");
                        };
                        let page = &pages[index];
                        debug!(page = %page.path, "displaying page");
                        presenter.display(page);
                        return Ok(Step::Displayed(page.path.clone()));
                    }
                    UnitAction::Ascend => {
                        self.position = match self.units[id.0].parent {
                            Some(parent) => Position::Unit(parent),
                            None => Position::Root,
                        };
                    }
                },
            }
        }
    }

    fn step_unit<S: OutcomeStore + ?Sized>(&mut self, id: UnitId, store: &S) -> UnitAction {
        loop {
            let unit = &self.units[id.0];
            if !unit.remaining().is_empty() {
                if !unit.predicate.evaluate(store, self.assignment.permutation) {
                    debug!(unit = %unit.path, "run-if rule false, skipping");
                    return UnitAction::Ascend;
                }
                let unit = &mut self.units[id.0];
                let Some(index) = unit.take_next() else {
                    return UnitAction::Ascend;
                };
                return match &unit.children {
                    Children::Units(children) => {
                        debug!(unit = %unit.path, child = children[index].0, "descending");
                        UnitAction::Descend(children[index])
                    }
                    Children::Pages { .. } => UnitAction::Show(index),
                };
            }

            let history = store.outcome_history(&unit.path);
            match unit.policy.decide(unit.iteration, &history) {
                LoopDecision::Repeat => {
                    debug!(
                        unit = %unit.path,
                        iteration = unit.iteration,
                        graded = history.len(),
                        "criterion not met, repeating"
                    );
                    self.reset(id);
                }
                LoopDecision::Stop => return UnitAction::Ascend,
            }
        }
    }

    /// Restart `id` and, recursively, every child it consumed this pass.
    /// Leaf-bearing units are re-ordered rather than replayed.
    fn reset(&mut self, id: UnitId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let unit = &mut self.units[id.0];
            let consumed = unit.consumed().to_vec();
            unit.rewind();
            match &unit.children {
                Children::Units(children) => {
                    pending.extend(consumed.iter().map(|&index| children[index]));
                }
                Children::Pages {
                    pages,
                    pseudorandom,
                } => match order_pages(pages, *pseudorandom, self.repair_window, &mut self.rng) {
                    Ok(order) => unit.set_order(order),
                    Err(err) => {
                        warn!(
                            unit = %unit.path,
                            error = %err,
                            "re-ordering failed, keeping previous order"
                        );
                    }
                },
            }
        }
    }

    pub fn assignment(&self) -> Assignment {
        self.assignment
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> &Unit {
        &self.units[id.0]
    }

    pub fn find(&self, path: &UnitPath) -> Option<UnitId> {
        self.units
            .iter()
            .position(|unit| &unit.path == path)
            .map(UnitId)
    }

    /// Top-level units in run order.
    pub fn top_level(&self) -> impl Iterator<Item = &Unit> + '_ {
        self.top.iter().map(|id| &self.units[id.0])
    }

    /// Indented rendering of the tree in current run order.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for id in &self.top {
            self.describe_unit(*id, 0, &mut out);
        }
        out
    }

    fn describe_unit(&self, id: UnitId, depth: usize, out: &mut String) {
        let unit = &self.units[id.0];
        let indent = "  ".repeat(depth);
        let _ = write!(out, "{indent}{}", unit.id);
        if let Some(criterion) = unit.policy.criterion {
            let _ = write!(out, " [criterion={criterion} cutoff={}]", unit.policy.cutoff);
        }
        if !matches!(unit.predicate, ConditionPredicate::Always) {
            let _ = write!(out, " (conditional)");
        }
        out.push('\n');
        match &unit.children {
            Children::Units(children) => {
                for &index in unit.order() {
                    self.describe_unit(children[index], depth + 1, out);
                }
            }
            Children::Pages { pages, .. } => {
                for &index in unit.order() {
                    let page = &pages[index];
                    let _ = write!(out, "{indent}  - {}", page.id);
                    if let Some(condition) = &page.condition {
                        let _ = write!(out, " <{condition}>");
                    }
                    out.push('\n');
                }
            }
        }
    }
}

fn resolve_page(script: &Script, page_id: &str) -> Result<UnitPath, ScriptConfigurationError> {
    let mut found = page_paths(script, page_id);
    match found.len() {
        1 => Ok(found.remove(0)),
        0 => Err(ScriptConfigurationError::new(format!(
            "runIf names unknown page '{page_id}'"
        ))),
        n => Err(ScriptConfigurationError::new(format!(
            "runIf page '{page_id}' is ambiguous ({n} pages share that id)"
        ))),
    }
}
