//! Deterministic, pure logic shared by the engine.
//!
//! Core modules must be free of I/O side effects. Randomness is always drawn
//! from a caller-supplied RNG so results are reproducible under a seed.

pub mod invariants;
pub mod looping;
pub mod ordering;
pub mod path;
pub mod predicate;
pub mod pseudorandom;
pub mod selection;
pub mod types;
