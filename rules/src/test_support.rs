//! Test-only helpers for building rules, models, contexts and fixtures.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::core::context::Context;
use crate::core::model::Model;
use crate::core::rule::Rule;
use crate::parser::rule::try_parse_rule;

/// Parse a rule, panicking with the parse error on failure.
pub fn rule(text: &str) -> Rule {
    try_parse_rule(text).unwrap_or_else(|err| panic!("parse rule '{}': {}", text, err))
}

/// Model from rule lines, in order.
pub fn model(lines: &[&str]) -> Model {
    lines.iter().map(|line| rule(line)).collect()
}

/// Fresh context over `lines` with no stored values.
pub fn context(lines: &[&str]) -> Context {
    Context::new(Arc::new(model(lines)))
}

/// Context over `lines` with `stored` taken as overrides.
pub fn context_with(lines: &[&str], stored: &[(&str, Value)]) -> Context {
    let mut context = context(lines);
    for (key, value) in stored {
        context.take_stored_value_for_key(value.clone(), key);
    }
    context
}

/// Write `contents` to `dir/name` and return the path.
pub fn write_fixture(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap_or_else(|err| panic!("write {}: {}", path.display(), err));
    path
}
