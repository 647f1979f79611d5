//! Rule context: stored values shadowing rule inference.
//!
//! The context is both the value store and the object qualifiers are
//! evaluated against, so rules may be conditioned on stored keys as well as
//! on other rule-derived keys.
//!
//! A context is not thread-safe. Give every thread its own `clone()` of a
//! prototype; clones share the model and copy the stored values.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::error::{Error, Result};
use crate::core::model::Model;
use crate::core::rule::Rule;
use crate::core::value::{KeyValueCoding, Value, assign_path, split_key_path};

#[derive(Debug, Default)]
pub struct Context {
    model: Option<Arc<Model>>,
    stored: BTreeMap<String, Value>,
    /// Keys whose inference is in progress, outermost first.
    resolving: RefCell<Vec<String>>,
}

impl Context {
    pub fn new(model: Arc<Model>) -> Self {
        Self {
            model: Some(model),
            ..Self::default()
        }
    }

    pub fn model(&self) -> Option<&Arc<Model>> {
        self.model.as_ref()
    }

    pub fn set_model(&mut self, model: Option<Arc<Model>>) {
        self.model = model;
    }

    /// Stored override if present, otherwise the inferred value.
    pub fn value_for_key(&self, key: &str) -> Result<Option<Value>> {
        if key.is_empty() {
            debug!("value requested for empty key");
            return Ok(None);
        }
        if let Some(value) = self.stored_value_for_key(key) {
            return Ok(Some(value.clone()));
        }
        self.inferred_value_for_key(key)
    }

    pub fn value_for_key_path(&self, path: &str) -> Result<Option<Value>> {
        KeyValueCoding::value_for_key_path(self, path)
    }

    pub fn stored_value_for_key(&self, key: &str) -> Option<&Value> {
        self.stored.get(key)
    }

    pub fn stored_values(&self) -> &BTreeMap<String, Value> {
        &self.stored
    }

    /// Install an override for `key`; `Value::Null` removes it.
    pub fn take_stored_value_for_key(&mut self, value: Value, key: &str) {
        if key.is_empty() {
            return;
        }
        if value.is_null() {
            self.stored.remove(key);
        } else {
            self.stored.insert(key.to_string(), value);
        }
    }

    pub fn take_value_for_key(&mut self, value: Value, key: &str) {
        self.take_stored_value_for_key(value, key);
    }

    /// Write `value` at a dotted path.
    ///
    /// The first segment names a stored value; deeper segments write into
    /// that value as a JSON object.
    pub fn take_value_for_key_path(&mut self, value: Value, path: &str) -> Result<()> {
        let segments = split_key_path(path)?;
        let Some((first, rest)) = segments.split_first() else {
            return Ok(());
        };
        if rest.is_empty() {
            self.take_stored_value_for_key(value, first);
            return Ok(());
        }
        let mut root = self.stored.remove(*first).unwrap_or(Value::Null);
        assign_path(&mut root, rest, value);
        self.take_stored_value_for_key(root, first);
        Ok(())
    }

    /// Drop all stored values, returning the context to pure inference.
    pub fn reset(&mut self) {
        self.stored.clear();
    }

    /// Value of the best-ranked rule whose qualifier matches this context.
    ///
    /// Stops at the first match. Rules whose qualifier cannot be evaluated
    /// are skipped with a warning.
    pub fn inferred_value_for_key(&self, key: &str) -> Result<Option<Value>> {
        if key.is_empty() {
            debug!("cannot infer value for empty key");
            return Ok(None);
        }
        let Some(model) = self.model.as_deref() else {
            debug!(key, "cannot infer values without a model");
            return Ok(None);
        };
        let _guard = self.enter(key)?;
        debug!(key, "infer value for key");

        let Some(candidates) = model.candidate_rules_for_key(Some(key)) else {
            debug!(key, "no candidates for key");
            return Ok(None);
        };
        for rule in candidates {
            if self.rule_matches(rule)? {
                debug!(key, rule = %rule, "qualifier matched");
                return rule.fire(self);
            }
        }
        debug!(key, "no rule qualifier matched");
        Ok(None)
    }

    /// Values of every rule whose qualifier matches, in rank order.
    ///
    /// Diagnostic counterpart of [`inferred_value_for_key`](Self::inferred_value_for_key);
    /// a matching rule that fires nothing contributes `Value::Null`.
    pub fn all_possible_values_for_key(&self, key: &str) -> Result<Option<Vec<Value>>> {
        if key.is_empty() {
            debug!("cannot calculate values for empty key");
            return Ok(None);
        }
        let Some(model) = self.model.as_deref() else {
            debug!(key, "cannot calculate values without a model");
            return Ok(None);
        };
        let _guard = self.enter(key)?;
        debug!(key, "infer all values for key");

        let Some(candidates) = model.candidate_rules_for_key(Some(key)) else {
            debug!(key, "no candidates for key");
            return Ok(None);
        };
        let mut values = Vec::new();
        for rule in candidates {
            if self.rule_matches(rule)? {
                debug!(key, rule = %rule, "qualifier matched");
                values.push(rule.fire(self)?.unwrap_or(Value::Null));
            }
        }
        debug!(key, matched = values.len(), "rules matched");
        Ok(Some(values))
    }

    /// For each value: store it at `value_key_path`, then evaluate `key_path`.
    ///
    /// The last value stays stored afterwards.
    pub fn values_for_key_path_while_taking_successive_values(
        &mut self,
        key_path: &str,
        values: &[Value],
        value_key_path: &str,
    ) -> Result<Vec<Option<Value>>> {
        let mut results = Vec::with_capacity(values.len());
        for value in values {
            self.take_value_for_key_path(value.clone(), value_key_path)?;
            results.push(self.value_for_key_path(key_path)?);
        }
        Ok(results)
    }

    fn rule_matches(&self, rule: &Rule) -> Result<bool> {
        let Some(qualifier) = rule.qualifier() else {
            warn!(rule = %rule, "rule has no qualifier, skipping");
            return Ok(false);
        };
        match qualifier.evaluate(self) {
            Ok(matched) => Ok(matched),
            Err(err) if err.is_cyclic_reference() => Err(err),
            Err(err) => {
                warn!(error = %err, rule = %rule, "rule qualifier cannot be evaluated, skipping");
                Ok(false)
            }
        }
    }

    /// Mark `key` as being inferred until the guard drops.
    fn enter(&self, key: &str) -> Result<ResolutionGuard<'_>> {
        let mut stack = self.resolving.borrow_mut();
        if let Some(start) = stack.iter().position(|k| k == key) {
            let mut chain = stack[start..].to_vec();
            chain.push(key.to_string());
            warn!(chain = ?chain, "cyclic rule reference");
            return Err(Error::CyclicReference { chain });
        }
        stack.push(key.to_string());
        Ok(ResolutionGuard {
            stack: &self.resolving,
        })
    }
}

struct ResolutionGuard<'a> {
    stack: &'a RefCell<Vec<String>>,
}

impl Drop for ResolutionGuard<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

/// Clones copy the stored values and share the model.
impl Clone for Context {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            stored: self.stored.clone(),
            resolving: RefCell::default(),
        }
    }
}

impl KeyValueCoding for Context {
    fn value_for_key(&self, key: &str) -> Result<Option<Value>> {
        Context::value_for_key(self, key)
    }
}
