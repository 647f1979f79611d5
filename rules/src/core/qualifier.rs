//! Qualifiers: the left-hand side of a rule.
//!
//! A qualifier decides whether a rule applies to a context. Ranking only
//! needs [`Qualifier::specificity`], so the model never inspects concrete
//! qualifier types.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::core::error::{Error, Result};
use crate::core::value::{KeyValueCoding, Value};

/// Boolean predicate evaluated against a key-value object (usually a
/// [`Context`](crate::core::context::Context)).
pub trait Qualifier: fmt::Debug + fmt::Display + Send + Sync {
    /// Evaluate against `object`.
    ///
    /// The default implementation reports that the qualifier cannot be
    /// evaluated in memory; the inference loop then skips the rule.
    fn evaluate(&self, object: &dyn KeyValueCoding) -> Result<bool> {
        let _ = object;
        Err(Error::UnsupportedQualifier {
            qualifier: self.to_string(),
        })
    }

    /// Secondary ranking signal for rules of equal priority.
    ///
    /// Boolean constants rank lowest (-1), compounds rank by member count and
    /// everything else ranks 0.
    fn specificity(&self) -> i32 {
        0
    }
}

/// Constant `*true*` / `*false*` qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BooleanQualifier(pub bool);

impl BooleanQualifier {
    pub const TRUE: BooleanQualifier = BooleanQualifier(true);
    pub const FALSE: BooleanQualifier = BooleanQualifier(false);
}

impl Qualifier for BooleanQualifier {
    fn evaluate(&self, _object: &dyn KeyValueCoding) -> Result<bool> {
        Ok(self.0)
    }

    fn specificity(&self) -> i32 {
        -1
    }
}

impl fmt::Display for BooleanQualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0 { "*true*" } else { "*false*" })
    }
}

/// Comparison operators understood by key qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessOrEqual,
    GreaterOrEqual,
    Like,
    CaseInsensitiveLike,
}

impl Operator {
    /// Map an operator token to its operator. Word operators are matched
    /// case-insensitively.
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token {
            "=" | "==" => Operator::Equal,
            "!=" | "<>" | "><" => Operator::NotEqual,
            "<" => Operator::LessThan,
            ">" => Operator::GreaterThan,
            "<=" | "=<" => Operator::LessOrEqual,
            ">=" | "=>" => Operator::GreaterOrEqual,
            _ if token.eq_ignore_ascii_case("like") => Operator::Like,
            _ if token.eq_ignore_ascii_case("ilike")
                || token.eq_ignore_ascii_case("caseInsensitiveLike")
                || token.eq_ignore_ascii_case("caseInsensitiveLike:") =>
            {
                Operator::CaseInsensitiveLike
            }
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::LessThan => "<",
            Operator::GreaterThan => ">",
            Operator::LessOrEqual => "<=",
            Operator::GreaterOrEqual => ">=",
            Operator::Like => "like",
            Operator::CaseInsensitiveLike => "ilike",
        }
    }

    fn is_like(self) -> bool {
        matches!(self, Operator::Like | Operator::CaseInsensitiveLike)
    }

    /// Apply the operator to two (possibly missing) values.
    pub fn compare(self, left: Option<&Value>, right: Option<&Value>) -> bool {
        match self {
            Operator::Equal => values_equal(left, right),
            Operator::NotEqual => !values_equal(left, right),
            Operator::LessThan => order(left, right) == Some(Ordering::Less),
            Operator::GreaterThan => order(left, right) == Some(Ordering::Greater),
            Operator::LessOrEqual => {
                matches!(order(left, right), Some(Ordering::Less | Ordering::Equal))
            }
            Operator::GreaterOrEqual => {
                matches!(
                    order(left, right),
                    Some(Ordering::Greater | Ordering::Equal)
                )
            }
            Operator::Like | Operator::CaseInsensitiveLike => {
                match (left.and_then(like_subject), right.and_then(Value::as_str)) {
                    (Some(subject), Some(pattern)) => like_pattern(pattern, self)
                        .is_some_and(|regex| regex.is_match(&subject)),
                    _ => false,
                }
            }
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn values_equal(left: Option<&Value>, right: Option<&Value>) -> bool {
    match (non_null(left), non_null(right)) {
        (None, None) => true,
        (Some(Value::Number(l)), Some(Value::Number(r))) => l.as_f64() == r.as_f64(),
        (Some(l), Some(r)) => l == r,
        _ => false,
    }
}

fn order(left: Option<&Value>, right: Option<&Value>) -> Option<Ordering> {
    match (non_null(left)?, non_null(right)?) {
        (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

fn like_subject(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Compile a `like` pattern: `*` matches any run, `?` a single character.
fn like_pattern(pattern: &str, op: Operator) -> Option<Regex> {
    let mut source = String::with_capacity(pattern.len() + 8);
    if op == Operator::CaseInsensitiveLike {
        source.push_str("(?i)");
    }
    source.push_str("(?s)^");
    for c in pattern.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            _ => source.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');
    Regex::new(&source).ok()
}

/// Render a literal the way the qualifier parser reads it back.
pub fn format_literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        other => other.to_string(),
    }
}

/// `keyPath <op> literal`, e.g. `pageName = 'Main'`.
#[derive(Debug, Clone)]
pub struct KeyValueQualifier {
    key_path: String,
    op: Operator,
    value: Value,
    pattern: Option<Regex>,
}

impl KeyValueQualifier {
    pub fn new(key_path: impl Into<String>, op: Operator, value: Value) -> Self {
        let pattern = match (&value, op.is_like()) {
            (Value::String(s), true) => like_pattern(s, op),
            _ => None,
        };
        Self {
            key_path: key_path.into(),
            op,
            value,
            pattern,
        }
    }

    pub fn key_path(&self) -> &str {
        &self.key_path
    }

    pub fn op(&self) -> Operator {
        self.op
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl Qualifier for KeyValueQualifier {
    fn evaluate(&self, object: &dyn KeyValueCoding) -> Result<bool> {
        let actual = object.value_for_key_path(&self.key_path)?;
        if let Some(regex) = &self.pattern {
            return Ok(actual
                .as_ref()
                .and_then(like_subject)
                .is_some_and(|subject| regex.is_match(&subject)));
        }
        Ok(self.op.compare(actual.as_ref(), Some(&self.value)))
    }
}

impl fmt::Display for KeyValueQualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.key_path,
            self.op,
            format_literal(&self.value)
        )
    }
}

/// `leftKeyPath <op> rightKeyPath`, both sides resolved against the object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyComparisonQualifier {
    left: String,
    op: Operator,
    right: String,
}

impl KeyComparisonQualifier {
    pub fn new(left: impl Into<String>, op: Operator, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            op,
            right: right.into(),
        }
    }
}

impl Qualifier for KeyComparisonQualifier {
    fn evaluate(&self, object: &dyn KeyValueCoding) -> Result<bool> {
        let left = object.value_for_key_path(&self.left)?;
        let right = object.value_for_key_path(&self.right)?;
        Ok(self.op.compare(left.as_ref(), right.as_ref()))
    }
}

impl fmt::Display for KeyComparisonQualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}

/// Negation. Counts as a simple qualifier for ranking.
#[derive(Debug, Clone)]
pub struct NotQualifier(pub Arc<dyn Qualifier>);

impl Qualifier for NotQualifier {
    fn evaluate(&self, object: &dyn KeyValueCoding) -> Result<bool> {
        Ok(!self.0.evaluate(object)?)
    }
}

impl fmt::Display for NotQualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NOT {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    pub fn as_str(self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

/// AND/OR over several qualifiers. Specificity is the member count.
#[derive(Debug, Clone)]
pub struct CompoundQualifier {
    conjunction: Conjunction,
    qualifiers: Vec<Arc<dyn Qualifier>>,
}

impl CompoundQualifier {
    pub fn and(qualifiers: Vec<Arc<dyn Qualifier>>) -> Self {
        Self {
            conjunction: Conjunction::And,
            qualifiers,
        }
    }

    pub fn or(qualifiers: Vec<Arc<dyn Qualifier>>) -> Self {
        Self {
            conjunction: Conjunction::Or,
            qualifiers,
        }
    }

    pub fn conjunction(&self) -> Conjunction {
        self.conjunction
    }

    pub fn qualifiers(&self) -> &[Arc<dyn Qualifier>] {
        &self.qualifiers
    }
}

impl Qualifier for CompoundQualifier {
    fn evaluate(&self, object: &dyn KeyValueCoding) -> Result<bool> {
        for qualifier in &self.qualifiers {
            let matched = qualifier.evaluate(object)?;
            match (self.conjunction, matched) {
                (Conjunction::And, false) => return Ok(false),
                (Conjunction::Or, true) => return Ok(true),
                _ => {}
            }
        }
        Ok(self.conjunction == Conjunction::And)
    }

    fn specificity(&self) -> i32 {
        i32::try_from(self.qualifiers.len()).unwrap_or(i32::MAX)
    }
}

impl fmt::Display for CompoundQualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = format!(" {} ", self.conjunction.as_str());
        let parts: Vec<String> = self.qualifiers.iter().map(ToString::to_string).collect();
        write!(f, "({})", parts.join(&separator))
    }
}
