//! Stable exit codes for `rules` CLI commands.

/// Command succeeded and, for queries, produced a value.
pub const OK: i32 = 0;
/// Unreadable config or model, unparseable rules, bad arguments.
pub const INVALID: i32 = 1;
/// `rules query` found no matching rule for the key.
pub const NO_VALUE: i32 = 2;
/// `rules query` ran into a cyclic rule reference.
pub const CYCLE: i32 = 3;
