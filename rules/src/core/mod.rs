//! Deterministic rule evaluation.
//!
//! Core modules are free of I/O. They operate on in-memory rules and
//! contexts and return deterministic results suitable for tests.

pub mod action;
pub mod context;
pub mod error;
pub mod model;
pub mod qualifier;
pub mod rule;
pub mod value;
