//! Right-hand side of a rule.

use std::fmt;

use tracing::debug;

use crate::core::error::Result;
use crate::core::rule::Rule;
use crate::core::value::{KeyValueCoding, Value};
use crate::parser::plist::format_property_list;

/// What a selected rule produces.
///
/// Firing never writes into the context; the value is returned to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// `key = 'constant'`: returns `value` unchanged.
    Assignment { key_path: String, value: Value },
    /// `key = otherKey`: resolves `value_path` against the context, which may
    /// trigger further inference.
    KeyAssignment {
        key_path: String,
        value_path: String,
    },
    /// Fires every member in order and returns the last result.
    Compound(Vec<Action>),
    /// Nested rule; candidacy and firing delegate to its action.
    Rule(Box<Rule>),
}

impl Action {
    pub fn assignment(key_path: impl Into<String>, value: impl Into<Value>) -> Self {
        Action::Assignment {
            key_path: key_path.into(),
            value: value.into(),
        }
    }

    pub fn key_assignment(key_path: impl Into<String>, value_path: impl Into<String>) -> Self {
        Action::KeyAssignment {
            key_path: key_path.into(),
            value_path: value_path.into(),
        }
    }

    /// Combine several actions. A single action is returned as-is.
    pub fn compound(mut actions: Vec<Action>) -> Self {
        if actions.len() == 1 {
            if let Some(action) = actions.pop() {
                return action;
            }
        }
        Action::Compound(actions)
    }

    /// The key this action assigns, for assignment variants.
    pub fn key_path(&self) -> Option<&str> {
        match self {
            Action::Assignment { key_path, .. } | Action::KeyAssignment { key_path, .. } => {
                Some(key_path)
            }
            Action::Compound(_) | Action::Rule(_) => None,
        }
    }

    /// Exact key match; `None` matches everything.
    ///
    /// A rule targeting `a.b` is not a candidate for `a` or `a.b.c`.
    pub fn is_candidate_for_key(&self, key: Option<&str>) -> bool {
        let Some(key) = key else {
            return true;
        };
        match self {
            Action::Assignment { key_path, .. } | Action::KeyAssignment { key_path, .. } => {
                key_path == key
            }
            Action::Compound(actions) => actions
                .iter()
                .any(|action| action.is_candidate_for_key(Some(key))),
            Action::Rule(rule) => rule.is_candidate_for_key(Some(key)),
        }
    }

    pub fn fire(&self, context: &dyn KeyValueCoding) -> Result<Option<Value>> {
        match self {
            Action::Assignment { value, .. } => {
                debug!(value = %value, "fire assignment");
                Ok((!value.is_null()).then(|| value.clone()))
            }
            Action::KeyAssignment { value_path, .. } => {
                debug!(value_path = %value_path, "fire key assignment");
                context.value_for_key_path(value_path)
            }
            Action::Compound(actions) => {
                let mut last = None;
                for action in actions {
                    last = action.fire(context)?;
                }
                Ok(last)
            }
            Action::Rule(rule) => rule.fire(context),
        }
    }
}

/// Render a literal so that the rule parser reads back an assignment.
///
/// Strings are always quoted; unquoted text would parse as a key assignment.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        Value::Array(_) | Value::Object(_) => format_property_list(value),
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Assignment { key_path, value } => {
                write!(f, "{} = {}", key_path, format_value(value))
            }
            Action::KeyAssignment {
                key_path,
                value_path,
            } => write!(f, "{} = {}", key_path, value_path),
            Action::Compound(actions) => {
                let parts: Vec<String> = actions.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Action::Rule(rule) => write!(f, "({})", rule),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn assignment_candidacy_is_exact() {
        let action = Action::assignment("a.b", "x");
        assert!(action.is_candidate_for_key(Some("a.b")));
        assert!(!action.is_candidate_for_key(Some("a")));
        assert!(!action.is_candidate_for_key(Some("a.b.c")));
        assert!(action.is_candidate_for_key(None));
    }

    #[test]
    fn assignment_fires_literal_without_context() {
        let empty: BTreeMap<String, Value> = BTreeMap::new();
        let action = Action::assignment("color", "red");
        assert_eq!(action.fire(&empty).expect("fire"), Some(json!("red")));
    }

    #[test]
    fn key_assignment_resolves_against_context() {
        let mut values = BTreeMap::new();
        values.insert("defaults".to_string(), json!({"color": "blue"}));
        let action = Action::key_assignment("color", "defaults.color");
        assert_eq!(action.fire(&values).expect("fire"), Some(json!("blue")));
    }

    #[test]
    fn compound_returns_last_and_matches_any_member() {
        let empty: BTreeMap<String, Value> = BTreeMap::new();
        let action = Action::compound(vec![
            Action::assignment("a", 1),
            Action::assignment("b", 2),
        ]);
        assert_eq!(action.fire(&empty).expect("fire"), Some(json!(2)));
        assert!(action.is_candidate_for_key(Some("a")));
        assert!(action.is_candidate_for_key(Some("b")));
        assert!(!action.is_candidate_for_key(Some("c")));
    }

    #[test]
    fn compound_of_one_is_unwrapped() {
        let action = Action::compound(vec![Action::assignment("a", 1)]);
        assert_eq!(action, Action::assignment("a", 1));
    }

    #[test]
    fn display_quotes_strings_only() {
        assert_eq!(Action::assignment("color", "red").to_string(), "color = \"red\"");
        assert_eq!(Action::assignment("size", 5).to_string(), "size = 5");
        assert_eq!(Action::assignment("show", true).to_string(), "show = true");
        assert_eq!(
            Action::key_assignment("color", "defaultColor").to_string(),
            "color = defaultColor"
        );
    }
}
