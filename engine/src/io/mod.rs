//! I/O helpers for engine commands.

pub mod config;
pub mod record_store;
pub mod script_store;
