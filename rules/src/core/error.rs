//! Errors raised while evaluating rules.

use thiserror::Error;

/// Evaluation result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the inference loop.
///
/// Parse problems never show up here: the parser logs and skips bad rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A chain of key assignments led back to a key that is already being
    /// inferred (`a -> b -> a`).
    #[error("cyclic rule reference: {}", .chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },

    /// The qualifier cannot be evaluated in memory. The inference loop treats
    /// the rule as non-matching.
    #[error("qualifier does not support evaluation: {qualifier}")]
    UnsupportedQualifier { qualifier: String },

    /// A keypath was empty or contained an empty segment.
    #[error("invalid key path '{path}'")]
    InvalidKeyPath { path: String },
}

impl Error {
    pub fn is_cyclic_reference(&self) -> bool {
        matches!(self, Error::CyclicReference { .. })
    }
}
