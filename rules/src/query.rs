//! Query helpers for `rules query` and `rules candidates`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use tracing::debug;

use crate::core::context::Context;
use crate::core::error::Error;
use crate::core::model::Model;
use crate::core::value::Value;
use crate::io::config::{RulesConfig, load_config};
use crate::io::loader::{LoadOptions, load_models};
use crate::parser::ParseError;
use crate::parser::rule::{ValueText, classify_value};

/// Where a query takes its rules and stored values from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySource {
    /// Config file; its models load before `models`.
    pub config_path: Option<PathBuf>,
    pub models: Vec<PathBuf>,
    /// Stored after the config's `stored` table, so they win.
    pub overrides: Vec<(String, Value)>,
}

/// Structured query outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Stored or inferred value.
    Value(Value),
    /// Every matching rule's value, best-ranked first (`--all`).
    Values(Vec<Value>),
    /// No stored value and no matching rule.
    NoValue,
    /// Inference ran into a cyclic rule reference.
    Cycle(Vec<String>),
}

/// Parse a `KEY=VALUE` override. Values use the rule value grammar; bare
/// words are plain strings rather than keypaths.
pub fn parse_override(text: &str) -> Result<(String, Value)> {
    let Some((key, raw)) = text.split_once('=') else {
        bail!("override '{}' must look like KEY=VALUE", text);
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("override '{}' has an empty key", text);
    }
    let value = match classify_value(raw) {
        Ok(ValueText::Literal(value)) => value,
        Ok(ValueText::KeyPath(word)) => Value::String(word),
        Err(ParseError::InvalidKeyPath { text }) => Value::String(text),
        Err(err) => return Err(err).with_context(|| format!("parse value for '{}'", key)),
    };
    Ok((key.to_string(), value))
}

/// Load the model named by `source`.
pub fn load_source_model(source: &QuerySource) -> Result<Model> {
    let (config, paths) = resolve_source(source)?;
    load_source_paths(&config, &paths)
}

/// Build a context with the source's model and stored values.
pub fn build_context(source: &QuerySource) -> Result<Context> {
    let (config, paths) = resolve_source(source)?;
    let model = load_source_paths(&config, &paths)?;
    let mut context = Context::new(Arc::new(model));
    for (key, value) in config.stored_values()? {
        context.take_stored_value_for_key(value, &key);
    }
    for (key, value) in &source.overrides {
        context
            .take_value_for_key_path(value.clone(), key)
            .with_context(|| format!("store override '{}'", key))?;
    }
    debug!(stored = context.stored_values().len(), "built query context");
    Ok(context)
}

/// Evaluate `key` (a key or keypath) against `context`.
///
/// With `all`, `key` is a plain key and every matching rule contributes.
pub fn query(context: &Context, key: &str, all: bool) -> Result<QueryOutcome> {
    let result = if all {
        context
            .all_possible_values_for_key(key)
            .map(|values| match values {
                Some(values) if !values.is_empty() => QueryOutcome::Values(values),
                _ => QueryOutcome::NoValue,
            })
    } else {
        context.value_for_key_path(key).map(|value| match value {
            Some(value) if !value.is_null() => QueryOutcome::Value(value),
            _ => QueryOutcome::NoValue,
        })
    };
    match result {
        Ok(outcome) => Ok(outcome),
        Err(Error::CyclicReference { chain }) => Ok(QueryOutcome::Cycle(chain)),
        Err(err) => Err(err).with_context(|| format!("query '{}'", key)),
    }
}

/// Candidate rules for `key` in rank order, in canonical text form.
pub fn candidate_lines(model: &Model, key: &str) -> Vec<String> {
    model
        .candidate_rules_for_key(Some(key))
        .unwrap_or_default()
        .into_iter()
        .map(ToString::to_string)
        .collect()
}

fn resolve_source(source: &QuerySource) -> Result<(RulesConfig, Vec<PathBuf>)> {
    let Some(config_path) = &source.config_path else {
        return Ok((RulesConfig::default(), source.models.clone()));
    };
    if !config_path.exists() {
        bail!("config {} not found", config_path.display());
    }
    let config =
        load_config(config_path).with_context(|| format!("load {}", config_path.display()))?;
    let base = config_path.parent().unwrap_or(Path::new("."));
    let mut paths = config.model_paths(base);
    paths.extend(source.models.iter().cloned());
    Ok((config, paths))
}

fn load_source_paths(config: &RulesConfig, paths: &[PathBuf]) -> Result<Model> {
    let options = LoadOptions {
        fail_on_parse_error: config.fail_on_parse_error,
    };
    load_models(paths, options)
}
