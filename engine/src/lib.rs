//! Presentation-order engine for block-structured experiments.
//!
//! A script declares a tree of blocks holding pages. The engine decides which
//! pages a participant sees and in what order: shuffles constrained by
//! exchangeable/counterbalanced siblings, Latin-square group selection,
//! adjacency-constrained pseudorandom page orders, run-if rules and
//! criterion-driven repetition.
//!
//! - **[`core`]**: Pure, deterministic logic (ordering, selection, predicates,
//!   looping decisions, script invariants). No I/O.
//! - **[`io`]**: Side-effecting operations (script/config/record files).
//!
//! [`experiment`] builds the unit tree and drives traversal; [`session`]
//! connects it to a participant and an outcome store.

pub mod core;
pub mod display;
pub mod exit_codes;
pub mod experiment;
pub mod io;
pub mod logging;
pub mod script;
pub mod session;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod unit;
