//! Priority-ranked rule inference.
//!
//! A [`Model`](core::model::Model) holds rules of the form
//! `qualifier => key = value ; priority`. A [`Context`](core::context::Context)
//! answers key queries from its stored values first and falls back to the
//! best-ranked rule whose qualifier matches.
//!
//! - **[`core`]**: Rules, ranking and inference. No I/O.
//! - **[`parser`]**: The textual rule grammar.
//! - **[`io`]**: Config files and model loading (XML and rule files).
//!
//! [`query`] and [`check`] coordinate the two for the `rules` CLI.

pub mod check;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod parser;
pub mod query;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
