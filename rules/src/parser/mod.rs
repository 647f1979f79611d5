//! Textual rule grammar.
//!
//! `parse_rule` logs failures and returns `None` so that one bad line never
//! aborts loading a rule file; the `try_` variants expose the [`ParseError`].

pub mod plist;
pub mod qualifier;
pub mod rule;
pub mod scan;

use thiserror::Error;

pub use rule::{parse_action, parse_priority, parse_rule, try_parse_action, try_parse_rule};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("rule is empty")]
    Empty,

    #[error("no '=>' separating qualifier and action in '{text}'")]
    MissingArrow { text: String },

    #[error("invalid qualifier at offset {offset}: {message}")]
    Qualifier { offset: usize, message: String },

    #[error("no '=' in assignment '{text}'")]
    MissingAssignment { text: String },

    #[error("type cast is not closed in '{text}'")]
    UnclosedTypeCast { text: String },

    #[error("invalid key path '{text}'")]
    InvalidKeyPath { text: String },

    #[error("invalid number '{text}'")]
    InvalidNumber { text: String },

    #[error("invalid property list at offset {offset}: {message}")]
    PropertyList { offset: usize, message: String },
}
