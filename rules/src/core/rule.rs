//! Rules: qualifier, action and priority.

use std::fmt;
use std::sync::Arc;

use crate::core::action::Action;
use crate::core::error::Result;
use crate::core::qualifier::Qualifier;
use crate::core::value::{KeyValueCoding, Value};

/// Named priorities of the textual rule grammar.
pub mod priority {
    pub const IMPORTANT: i32 = 1000;
    pub const VERY_HIGH: i32 = 200;
    pub const HIGH: i32 = 150;
    pub const NORMAL: i32 = 100;
    pub const LOW: i32 = 50;
    pub const VERY_LOW: i32 = 5;
    pub const FALLBACK: i32 = 0;
}

/// A `qualifier => action ; priority` triple.
///
/// Setters exist for editing tools; a rule must not change while a model
/// containing it is being queried (shared models are behind `Arc` and cannot
/// be mutated).
#[derive(Debug, Clone)]
pub struct Rule {
    qualifier: Option<Arc<dyn Qualifier>>,
    action: Option<Action>,
    priority: i32,
}

impl Rule {
    pub fn new(qualifier: Arc<dyn Qualifier>, action: Action, priority: i32) -> Self {
        Self {
            qualifier: Some(qualifier),
            action: Some(action),
            priority,
        }
    }

    /// Build a rule from optional parts.
    pub fn from_parts(
        qualifier: Option<Arc<dyn Qualifier>>,
        action: Option<Action>,
        priority: i32,
    ) -> Self {
        Self {
            qualifier,
            action,
            priority,
        }
    }

    pub fn qualifier(&self) -> Option<&Arc<dyn Qualifier>> {
        self.qualifier.as_ref()
    }

    pub fn set_qualifier(&mut self, qualifier: Option<Arc<dyn Qualifier>>) {
        self.qualifier = qualifier;
    }

    pub fn action(&self) -> Option<&Action> {
        self.action.as_ref()
    }

    pub fn set_action(&mut self, action: Option<Action>) {
        self.action = action;
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    /// Qualifier specificity; a rule without qualifier ranks like `*true*`.
    pub fn specificity(&self) -> i32 {
        self.qualifier.as_ref().map_or(-1, |q| q.specificity())
    }

    /// `None` or an empty key is a wildcard.
    pub fn is_candidate_for_key(&self, key: Option<&str>) -> bool {
        match key {
            None => true,
            Some(key) if key.is_empty() => true,
            Some(key) => self
                .action
                .as_ref()
                .is_some_and(|action| action.is_candidate_for_key(Some(key))),
        }
    }

    pub fn fire(&self, context: &dyn KeyValueCoding) -> Result<Option<Value>> {
        match &self.action {
            Some(action) => action.fire(context),
            None => Ok(None),
        }
    }
}

/// Rules compare by their canonical text.
impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
            && self.action == other.action
            && self.qualifier.as_ref().map(ToString::to_string)
                == other.qualifier.as_ref().map(ToString::to_string)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}", q)?,
            None => f.write_str("*true*")?,
        }
        f.write_str(" => ")?;
        match &self.action {
            Some(action) => write!(f, "{}", action)?,
            None => f.write_str("null")?,
        }
        write!(f, " ; {}", self.priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::qualifier::BooleanQualifier;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn yellow() -> Rule {
        Rule::new(
            Arc::new(BooleanQualifier::TRUE),
            Action::assignment("color", "yellow"),
            priority::NORMAL,
        )
    }

    #[test]
    fn empty_key_is_wildcard() {
        let rule = yellow();
        assert!(rule.is_candidate_for_key(None));
        assert!(rule.is_candidate_for_key(Some("")));
        assert!(rule.is_candidate_for_key(Some("color")));
        assert!(!rule.is_candidate_for_key(Some("size")));
    }

    #[test]
    fn rule_without_action_is_never_a_keyed_candidate() {
        let rule = Rule::from_parts(None, None, priority::NORMAL);
        assert!(!rule.is_candidate_for_key(Some("color")));
        let empty: BTreeMap<String, Value> = BTreeMap::new();
        assert_eq!(rule.fire(&empty).expect("fire"), None);
        assert_eq!(rule.specificity(), -1);
    }

    #[test]
    fn nested_rule_delegates_to_its_action() {
        let outer = Rule::new(
            Arc::new(BooleanQualifier::TRUE),
            Action::Rule(Box::new(yellow())),
            priority::HIGH,
        );
        assert!(outer.is_candidate_for_key(Some("color")));
        let empty: BTreeMap<String, Value> = BTreeMap::new();
        assert_eq!(outer.fire(&empty).expect("fire"), Some(json!("yellow")));
    }

    #[test]
    fn canonical_form() {
        assert_eq!(yellow().to_string(), "*true* => color = \"yellow\" ; 100");
    }
}
