//! Rule model and candidate ranking.

use std::cmp::Ordering;

use crate::core::rule::Rule;

/// A set of rules in insertion order.
///
/// Mutation needs `&mut self`, so a model shared through `Arc` by several
/// contexts is frozen. Nothing is cached: every query re-ranks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    rules: Vec<Rule>,
}

impl Model {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn set_rules(&mut self, rules: Vec<Rule>) {
        self.rules = rules;
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn add_rules(&mut self, rules: impl IntoIterator<Item = Rule>) {
        self.rules.extend(rules);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules whose action targets `key`, best first.
    ///
    /// Returns `None` when nothing qualifies (never an empty vector). Order:
    /// priority descending, then qualifier specificity descending, then
    /// insertion order.
    pub fn candidate_rules_for_key(&self, key: Option<&str>) -> Option<Vec<&Rule>> {
        let mut candidates: Vec<&Rule> = self
            .rules
            .iter()
            .filter(|rule| rule.is_candidate_for_key(key))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        candidates.sort_by(|a, b| compare_rules(a, b));
        Some(candidates)
    }
}

impl FromIterator<Rule> for Model {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Ranking comparator: `Less` means `a` is preferred over `b`.
pub fn compare_rules(a: &Rule, b: &Rule) -> Ordering {
    b.priority()
        .cmp(&a.priority())
        .then_with(|| b.specificity().cmp(&a.specificity()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::action::Action;
    use crate::core::qualifier::{BooleanQualifier, CompoundQualifier, KeyValueQualifier, Operator, Qualifier};
    use crate::core::rule::priority;
    use serde_json::json;
    use std::sync::Arc;

    fn simple(key: &str) -> Arc<dyn Qualifier> {
        Arc::new(KeyValueQualifier::new(key, Operator::Equal, json!(1)))
    }

    fn rule(qualifier: Arc<dyn Qualifier>, value: &str, priority: i32) -> Rule {
        Rule::new(qualifier, Action::assignment("color", value), priority)
    }

    fn values(rules: &[&Rule]) -> Vec<String> {
        rules
            .iter()
            .map(|rule| match rule.action() {
                Some(Action::Assignment { value, .. }) => value.as_str().unwrap_or("").to_string(),
                _ => String::new(),
            })
            .collect()
    }

    #[test]
    fn empty_model_has_no_candidates() {
        let model = Model::default();
        assert!(model.candidate_rules_for_key(Some("color")).is_none());
    }

    #[test]
    fn unmatched_key_has_no_candidates() {
        let model = Model::new(vec![rule(Arc::new(BooleanQualifier::TRUE), "x", 0)]);
        assert!(model.candidate_rules_for_key(Some("size")).is_none());
    }

    #[test]
    fn priority_dominates_specificity() {
        let model = Model::new(vec![
            rule(
                Arc::new(CompoundQualifier::and(vec![simple("a"), simple("b")])),
                "compound",
                priority::LOW,
            ),
            rule(Arc::new(BooleanQualifier::TRUE), "constant", priority::HIGH),
        ]);
        let ranked = model.candidate_rules_for_key(Some("color")).expect("candidates");
        assert_eq!(values(&ranked), vec!["constant", "compound"]);
    }

    #[test]
    fn equal_priority_ranks_by_specificity() {
        let model = Model::new(vec![
            rule(Arc::new(BooleanQualifier::TRUE), "constant", priority::NORMAL),
            Rule::from_parts(None, Some(Action::assignment("color", "none")), priority::NORMAL),
            rule(simple("a"), "simple", priority::NORMAL),
            rule(
                Arc::new(CompoundQualifier::or(vec![simple("a"), simple("b")])),
                "two",
                priority::NORMAL,
            ),
            rule(
                Arc::new(CompoundQualifier::and(vec![simple("a"), simple("b"), simple("c")])),
                "three",
                priority::NORMAL,
            ),
        ]);
        let ranked = model.candidate_rules_for_key(Some("color")).expect("candidates");
        assert_eq!(
            values(&ranked),
            vec!["three", "two", "simple", "constant", "none"]
        );
    }

    #[test]
    fn remaining_ties_keep_insertion_order() {
        let model = Model::new(vec![
            rule(simple("a"), "first", priority::NORMAL),
            rule(simple("b"), "second", priority::NORMAL),
            rule(simple("c"), "third", priority::NORMAL),
        ]);
        let ranked = model.candidate_rules_for_key(Some("color")).expect("candidates");
        assert_eq!(values(&ranked), vec!["first", "second", "third"]);
    }

    #[test]
    fn ranking_is_idempotent() {
        let model: Model = vec![
            rule(simple("a"), "a", priority::LOW),
            rule(Arc::new(BooleanQualifier::TRUE), "b", priority::HIGH),
            rule(simple("c"), "c", priority::HIGH),
        ]
        .into_iter()
        .collect();
        let first = model.candidate_rules_for_key(Some("color")).expect("candidates");
        let second = model.candidate_rules_for_key(Some("color")).expect("candidates");
        assert_eq!(first.len(), second.len());
        assert!(first.iter().zip(&second).all(|(a, b)| std::ptr::eq(*a, *b)));
    }

    #[test]
    fn add_rules_appends_in_order() {
        let mut model = Model::default();
        model.add_rule(rule(simple("a"), "a", priority::NORMAL));
        model.add_rules(vec![rule(simple("b"), "b", priority::NORMAL)]);
        assert_eq!(model.len(), 2);
        let ranked = model.candidate_rules_for_key(None).expect("candidates");
        assert_eq!(values(&ranked), vec!["a", "b"]);
    }
}
