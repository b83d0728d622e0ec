//! Stable exit codes for engine CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid input, unreadable files or other I/O failures.
pub const INVALID: i32 = 1;
/// The script was rejected as a configuration error (schema, invariants,
/// or a constraint that could not be satisfied during construction).
pub const CONFIG: i32 = 2;
