//! `<qualifier> => <keypath> = <value> [; <priority>]`

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::core::action::Action;
use crate::core::qualifier::{BooleanQualifier, Qualifier};
use crate::core::rule::{Rule, priority};
use crate::core::value::split_key_path;
use crate::parser::ParseError;
use crate::parser::plist::parse_property_list;
use crate::parser::qualifier::parse_qualifier;
use crate::parser::scan::{find_unquoted, find_unquoted_top_level};

/// Parse one rule, logging and returning `None` on failure.
pub fn parse_rule(text: &str) -> Option<Rule> {
    match try_parse_rule(text) {
        Ok(rule) => Some(rule),
        Err(err) => {
            info!(rule = %text, error = %err, "could not parse rule");
            None
        }
    }
}

pub fn try_parse_rule(text: &str) -> Result<Rule, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let arrow = find_unquoted(text, "=>")
        .filter(|idx| *idx >= 3)
        .ok_or_else(|| ParseError::MissingArrow {
            text: text.to_string(),
        })?;

    let qualifier = parse_qualifier_text(text[..arrow].trim())?;

    let remainder = &text[arrow + 2..];
    let (action_text, priority) = match find_unquoted_top_level(remainder, ";") {
        Some(idx) => (&remainder[..idx], parse_priority(&remainder[idx + 1..])),
        None => (remainder, priority::NORMAL),
    };

    let action = try_parse_action(action_text, None)?;
    let rule = Rule::new(qualifier, action, priority);
    debug!(rule = %rule, "parsed rule");
    Ok(rule)
}

/// Qualifier side of a rule. `*true*`/`*false*` map to constants.
pub fn parse_qualifier_text(text: &str) -> Result<Arc<dyn Qualifier>, ParseError> {
    match text.trim() {
        "*true*" => Ok(Arc::new(BooleanQualifier::TRUE)),
        "*false*" => Ok(Arc::new(BooleanQualifier::FALSE)),
        other => parse_qualifier(other),
    }
}

/// Numeric or named priority; unknown names fall back to `normal`.
pub fn parse_priority(text: &str) -> i32 {
    let text = text.trim();
    if text.is_empty() {
        return priority::NORMAL;
    }
    if text.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        return text.parse().unwrap_or_else(|_| {
            warn!(priority = %text, "invalid numeric rule priority");
            priority::NORMAL
        });
    }
    match text {
        "important" => priority::IMPORTANT,
        "very high" => priority::VERY_HIGH,
        "high" => priority::HIGH,
        "normal" | "default" => priority::NORMAL,
        "low" => priority::LOW,
        "very low" => priority::VERY_LOW,
        "fallback" => priority::FALLBACK,
        _ => {
            warn!(priority = %text, "unknown rule priority");
            priority::NORMAL
        }
    }
}

/// Action variants that can be forced with a `(ClassName)` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionKind {
    Assignment,
    KeyAssignment,
}

impl ActionKind {
    fn from_class_name(name: &str) -> Option<Self> {
        match name.trim() {
            "Assignment" | "RuleAssignment" => Some(ActionKind::Assignment),
            "KeyAssignment" | "RuleKeyAssignment" => Some(ActionKind::KeyAssignment),
            _ => None,
        }
    }
}

/// Parse an action, logging and returning `None` on failure.
pub fn parse_action(text: &str, forced_class: Option<&str>) -> Option<Action> {
    match try_parse_action(text, forced_class) {
        Ok(action) => Some(action),
        Err(err) => {
            info!(action = %text, error = %err, "could not parse action");
            None
        }
    }
}

/// `keyPath = value`, optionally prefixed with `(ClassName)`.
///
/// `forced_class` (from the XML `class` attribute) applies when the text has
/// no prefix of its own.
pub fn try_parse_action(text: &str, forced_class: Option<&str>) -> Result<Action, ParseError> {
    let mut text = text.trim();
    if text.is_empty() {
        return Err(ParseError::MissingAssignment {
            text: text.to_string(),
        });
    }

    let mut class_name = forced_class.filter(|name| !name.trim().is_empty());
    if let Some(cast) = text.strip_prefix('(') {
        let Some(end) = cast.find(')') else {
            error!(action = %text, "type cast is not closed");
            return Err(ParseError::UnclosedTypeCast {
                text: text.to_string(),
            });
        };
        class_name = Some(&cast[..end]);
        text = cast[end + 1..].trim_start();
    }
    let forced = class_name.and_then(|name| {
        let kind = ActionKind::from_class_name(name);
        if kind.is_none() {
            error!(class = %name, "unknown action class, classifying value instead");
        }
        kind
    });

    let split = find_unquoted(text, "=")
        .filter(|idx| *idx >= 1)
        .ok_or_else(|| ParseError::MissingAssignment {
            text: text.to_string(),
        })?;
    let key_path = text[..split].trim();
    let value_text = text[split + 1..].trim();
    if key_path.is_empty() {
        return Err(ParseError::MissingAssignment {
            text: text.to_string(),
        });
    }

    let action = match forced {
        Some(ActionKind::Assignment) => Action::assignment(key_path, value_text),
        Some(ActionKind::KeyAssignment) => {
            Action::key_assignment(key_path, checked_key_path(value_text)?)
        }
        None => match classify_value(value_text)? {
            ValueText::Literal(value) => Action::assignment(key_path, value),
            ValueText::KeyPath(path) => Action::key_assignment(key_path, path),
        },
    };
    Ok(action)
}

/// Right-hand side of an assignment after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueText {
    Literal(Value),
    KeyPath(String),
}

/// Classify assignment value text.
///
/// Quoted strings, numbers, property lists, booleans and `null`/`nil` are
/// literals; anything else is a keypath reference.
pub fn classify_value(text: &str) -> Result<ValueText, ParseError> {
    let text = text.trim();
    let Some(first) = text.chars().next() else {
        return Ok(ValueText::Literal(Value::String(String::new())));
    };

    if first == '"' || first == '\'' {
        let inner = &text[1..];
        return Ok(ValueText::Literal(Value::String(
            match inner.strip_suffix(first) {
                Some(unquoted) if !inner.is_empty() => unquoted.to_string(),
                _ => {
                    error!(value = %text, "string value of assignment misses a closing quote");
                    inner.to_string()
                }
            },
        )));
    }
    if first.is_ascii_digit() || first == '-' {
        return parse_number(text).map(ValueText::Literal);
    }
    if first == '{' || first == '(' {
        return parse_property_list(text)
            .map(ValueText::Literal)
            .inspect_err(|err| error!(value = %text, error = %err, "could not parse plist of assignment"));
    }
    let literal = match text {
        "true" | "YES" => Value::Bool(true),
        "false" | "NO" => Value::Bool(false),
        "null" | "nil" => Value::Null,
        _ => return checked_key_path(text).map(ValueText::KeyPath),
    };
    Ok(ValueText::Literal(literal))
}

/// A keypath reference must resolve without `InvalidKeyPath` at query time.
fn checked_key_path(text: &str) -> Result<String, ParseError> {
    split_key_path(text).map_err(|_| ParseError::InvalidKeyPath {
        text: text.to_string(),
    })?;
    Ok(text.to_string())
}

fn parse_number(text: &str) -> Result<Value, ParseError> {
    if let Ok(int) = text.parse::<i64>() {
        return Ok(Value::from(int));
    }
    text.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| ParseError::InvalidNumber {
            text: text.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn action_of(text: &str) -> Action {
        try_parse_rule(text)
            .expect("rule")
            .action()
            .cloned()
            .expect("action")
    }

    #[test]
    fn parses_constant_rule() {
        let rule = try_parse_rule("*true* => color = 'yellow' ; normal").expect("rule");
        assert_eq!(rule.priority(), priority::NORMAL);
        assert_eq!(rule.specificity(), -1);
        assert_eq!(rule.action(), Some(&Action::assignment("color", "yellow")));
        assert_eq!(rule.to_string(), "*true* => color = \"yellow\" ; 100");
    }

    #[test]
    fn parses_qualified_rule_without_priority() {
        let rule = try_parse_rule("pageName = 'Main' => color = \"green\"").expect("rule");
        assert_eq!(rule.priority(), priority::NORMAL);
        assert_eq!(rule.specificity(), 0);
        assert_eq!(rule.action(), Some(&Action::assignment("color", "green")));
    }

    #[test]
    fn priority_vocabulary() {
        assert_eq!(parse_priority("fallback"), 0);
        assert_eq!(parse_priority("high"), 150);
        assert_eq!(parse_priority(" very high "), 200);
        assert_eq!(parse_priority("very low"), 5);
        assert_eq!(parse_priority("important"), 1000);
        assert_eq!(parse_priority("default"), 100);
        assert_eq!(parse_priority("7"), 7);
        assert_eq!(parse_priority("-3"), -3);
        assert_eq!(parse_priority("bogus"), 100);
        assert_eq!(parse_priority("High"), 100);
        assert_eq!(parse_priority("-x"), 100);
    }

    #[test]
    fn classifies_values() {
        assert_eq!(action_of("*true* => a = 5"), Action::assignment("a", 5));
        assert_eq!(action_of("*true* => a = -2"), Action::assignment("a", -2));
        assert_eq!(action_of("*true* => a = 1.5"), Action::assignment("a", 1.5));
        assert_eq!(action_of("*true* => a = YES"), Action::assignment("a", true));
        assert_eq!(action_of("*true* => a = false"), Action::assignment("a", false));
        assert_eq!(action_of("*true* => a = nil"), Action::assignment("a", Value::Null));
        assert_eq!(
            action_of("*true* => a = defaultColor"),
            Action::key_assignment("a", "defaultColor")
        );
        assert_eq!(
            action_of("*true* => a = session.user.name"),
            Action::key_assignment("a", "session.user.name")
        );
    }

    #[test]
    fn property_list_values_may_contain_separators() {
        let rule = try_parse_rule("*true* => tabs = { a = 1; b = ( x, y ); } ; high").expect("rule");
        assert_eq!(rule.priority(), priority::HIGH);
        assert_eq!(
            rule.action(),
            Some(&Action::assignment("tabs", json!({"a": 1, "b": ["x", "y"]})))
        );
    }

    #[test]
    fn quoted_separators_are_ignored() {
        let rule = try_parse_rule("title = 'a => b' => label = 'x; y' ; low").expect("rule");
        assert_eq!(rule.priority(), priority::LOW);
        assert_eq!(rule.action(), Some(&Action::assignment("label", "x; y")));
        assert_eq!(rule.qualifier().expect("qualifier").to_string(), "title = 'a => b'");
    }

    #[test]
    fn unterminated_string_value_is_recovered() {
        assert_eq!(
            action_of("*true* => a = 'open"),
            Action::assignment("a", "open")
        );
    }

    #[test]
    fn type_cast_forces_variant() {
        assert_eq!(
            action_of("*true* => (RuleAssignment) a = defaultColor"),
            Action::assignment("a", "defaultColor")
        );
        assert_eq!(
            action_of("*true* => (KeyAssignment) a = b"),
            Action::key_assignment("a", "b")
        );
        assert_eq!(
            try_parse_action("a = 5", Some("RuleKeyAssignment")).expect("action"),
            Action::key_assignment("a", "5")
        );
        assert_eq!(
            action_of("*true* => (Unknown) a = 5"),
            Action::assignment("a", 5)
        );
        assert!(matches!(
            try_parse_action("(Broken a = 5", None),
            Err(ParseError::UnclosedTypeCast { .. })
        ));
    }

    #[test]
    fn rejects_malformed_rules() {
        assert_eq!(try_parse_rule("  ").unwrap_err(), ParseError::Empty);
        assert!(matches!(
            try_parse_rule("color = 'x'"),
            Err(ParseError::MissingArrow { .. })
        ));
        assert!(matches!(
            try_parse_rule("a => b = 1"),
            Err(ParseError::MissingArrow { .. })
        ));
        assert!(matches!(
            try_parse_rule("*true* => color"),
            Err(ParseError::MissingAssignment { .. })
        ));
        assert!(matches!(
            try_parse_rule("*true* => a = -"),
            Err(ParseError::InvalidNumber { .. })
        ));
        assert!(matches!(
            try_parse_rule("*true* => a = { x = ; }"),
            Err(ParseError::PropertyList { .. })
        ));
        assert!(parse_rule("a ~~ 1 => b = 2").is_none());
    }

    #[test]
    fn malformed_key_path_values_are_rejected() {
        assert_eq!(
            classify_value("a..b"),
            Err(ParseError::InvalidKeyPath {
                text: "a..b".to_string()
            })
        );
        assert!(matches!(
            try_parse_rule("*true* => color = a..b"),
            Err(ParseError::InvalidKeyPath { .. })
        ));
        assert!(matches!(
            try_parse_rule("*true* => (KeyAssignment) color = .theme"),
            Err(ParseError::InvalidKeyPath { .. })
        ));
        assert!(parse_rule("*true* => color = theme.").is_none());
        assert_eq!(
            classify_value("defaults.color"),
            Ok(ValueText::KeyPath("defaults.color".to_string()))
        );
    }
}
