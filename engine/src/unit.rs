//! Nodes of the experiment tree and their run-order state.

use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::{Map, Value};

use crate::core::looping::LoopPolicy;
use crate::core::path::UnitPath;
use crate::core::predicate::ConditionPredicate;
use crate::core::pseudorandom::pseudorandom_order;
use crate::core::types::{ConditionTag, ScriptConfigurationError};
use crate::script::PageSpec;

/// Index of a unit inside its experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub usize);

/// A displayable page, as handed to the presenter.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub id: String,
    pub path: UnitPath,
    pub condition: Option<ConditionTag>,
    /// Presentation data from the script, untouched by the engine.
    pub content: Map<String, Value>,
}

impl Page {
    pub fn from_spec(spec: &PageSpec, parent: &UnitPath) -> Self {
        Self {
            id: spec.id.clone(),
            path: parent.child(&spec.id),
            condition: spec.condition.clone(),
            content: spec.content.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Children {
    /// Branch unit: sub-blocks, ordered once at construction.
    Units(Vec<UnitId>),
    /// Leaf-bearing unit: pages, re-ordered on every restart.
    Pages { pages: Vec<Page>, pseudorandom: bool },
}

/// One block of the experiment.
///
/// Children are never moved. `order` is the current run order (indices into
/// the children) and `cursor` splits it: `order[..cursor]` has been consumed
/// this pass, `order[cursor..]` remains.
#[derive(Debug, Clone)]
pub struct Unit {
    pub id: String,
    pub path: UnitPath,
    /// `None` for top-level units, whose parent is the experiment root.
    pub parent: Option<UnitId>,
    pub predicate: ConditionPredicate,
    pub policy: LoopPolicy,
    /// Starts at 1 and grows by one on every restart.
    pub iteration: u32,
    pub children: Children,
    order: Vec<usize>,
    cursor: usize,
}

impl Unit {
    pub fn new(
        id: &str,
        path: UnitPath,
        parent: Option<UnitId>,
        predicate: ConditionPredicate,
        policy: LoopPolicy,
        children: Children,
    ) -> Self {
        let mut unit = Self {
            id: id.to_string(),
            path,
            parent,
            predicate,
            policy,
            iteration: 1,
            children,
            order: Vec::new(),
            cursor: 0,
        };
        unit.order = (0..unit.child_count()).collect();
        unit
    }

    pub fn child_count(&self) -> usize {
        match &self.children {
            Children::Units(units) => units.len(),
            Children::Pages { pages, .. } => pages.len(),
        }
    }

    pub fn remaining(&self) -> &[usize] {
        &self.order[self.cursor..]
    }

    pub fn consumed(&self) -> &[usize] {
        &self.order[..self.cursor]
    }

    /// Current run order over all children.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Move the head of the remaining children to the consumed side.
    pub fn take_next(&mut self) -> Option<usize> {
        let next = self.order.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(next)
    }

    /// Replace the run order and start a fresh pass over it.
    ///
    /// `order` must be a permutation of the child indices.
    pub fn set_order(&mut self, order: Vec<usize>) {
        debug_assert_eq!(order.len(), self.child_count());
        self.order = order;
        self.cursor = 0;
    }

    /// Begin the next iteration: every child becomes remaining again.
    pub fn rewind(&mut self) {
        self.iteration += 1;
        self.cursor = 0;
    }

    pub fn is_leaf_bearing(&self) -> bool {
        matches!(self.children, Children::Pages { .. })
    }
}

/// Run order for a leaf-bearing unit's pages: a plain shuffle, or the
/// adjacency-constrained ordering when `pseudorandom` is set.
pub fn order_pages<R: Rng + ?Sized>(
    pages: &[Page],
    pseudorandom: bool,
    window: usize,
    rng: &mut R,
) -> Result<Vec<usize>, ScriptConfigurationError> {
    if pseudorandom {
        let conditions: Vec<Option<&ConditionTag>> =
            pages.iter().map(|page| page.condition.as_ref()).collect();
        return pseudorandom_order(&conditions, window, rng);
    }
    let mut order: Vec<usize> = (0..pages.len()).collect();
    order.shuffle(rng);
    Ok(order)
}
